/// Configuration management for the API server
///
/// Loads configuration from environment variables (with `.env` support)
/// and groups it by backend.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: `*`)
/// - `API_PRODUCTION`: Marks session cookies `Secure` (default: true)
/// - database, Redis and engine variables as documented on
///   [`DatabaseConfig`], [`RedisConfig`] and [`EngineConfig`]
///
/// # Example
///
/// ```no_run
/// use taskforge_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;

use serde::{Deserialize, Serialize};
use taskforge_shared::config::{parse_var, EngineConfig};
use taskforge_shared::db::pool::DatabaseConfig;
use taskforge_shared::redis::RedisConfig;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub engine: EngineConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Origins allowed to call the API with credentials
    pub cors_origins: Vec<String>,

    /// Adds `Secure` to the session cookie
    pub production: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
            production: true,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let cors_origins = match env::var("CORS_ORIGINS") {
            Ok(raw) => raw
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            Err(_) => defaults.cors_origins,
        };

        Ok(Self {
            host: env::var("API_HOST").unwrap_or(defaults.host),
            port: parse_var("API_PORT", defaults.port)?,
            cors_origins,
            production: parse_var("API_PRODUCTION", defaults.production)?,
        })
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|origin| origin == "*")
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` or `REDIS_URL` is missing
    /// - a variable has an invalid value
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            api: ApiConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            redis: RedisConfig::from_env()?,
            engine: EngineConfig::from_env()?,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
