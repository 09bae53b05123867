/// Engine configuration
///
/// Settings the authorization engine needs regardless of which binary hosts
/// it. Loaded from the environment (with `.env` support) like the other
/// `from_env` constructors in the workspace.
///
/// # Environment Variables
///
/// - `APP_URL`: base URL for links in notifications (default: `http://localhost:8080`)
/// - `SESSION_TTL_SECS`: session cache TTL (default: 3600)
/// - `OPERATION_TIMEOUT_SECS`: deadline for each engine operation (default: 10)
/// - `NOTIFICATION_STREAM`: Redis stream for outbound messages (default: `notifications:outbound`)
/// - `PASSWORD_MEMORY_KIB`, `PASSWORD_ITERATIONS`, `PASSWORD_PARALLELISM`:
///   Argon2id cost (default: 65536 / 3 / 4)
/// - `LOG_JSON`: emit JSON logs (default: false)

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::password::PasswordParams;

/// Configuration shared by the engine and its hosts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base URL without trailing slash
    pub app_url: String,

    /// How long a session snapshot stays in the cache
    pub session_ttl: Duration,

    /// Deadline for a single engine operation
    pub operation_timeout: Duration,

    /// Redis stream receiving notifications
    pub notification_stream: String,

    /// Argon2id cost for new password hashes
    pub password: PasswordParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            app_url: "http://localhost:8080".to_string(),
            session_ttl: Duration::from_secs(3600),
            operation_timeout: Duration::from_secs(10),
            notification_stream: "notifications:outbound".to_string(),
            password: PasswordParams::default(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but can't be parsed
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let app_url = env::var("APP_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.app_url);

        Ok(Self {
            app_url,
            session_ttl: Duration::from_secs(parse_var("SESSION_TTL_SECS", 3600)?),
            operation_timeout: Duration::from_secs(parse_var("OPERATION_TIMEOUT_SECS", 10)?),
            notification_stream: env::var("NOTIFICATION_STREAM")
                .unwrap_or(defaults.notification_stream),
            password: PasswordParams {
                memory_kib: parse_var("PASSWORD_MEMORY_KIB", defaults.password.memory_kib)?,
                iterations: parse_var("PASSWORD_ITERATIONS", defaults.password.iterations)?,
                parallelism: parse_var("PASSWORD_PARALLELISM", defaults.password.parallelism)?,
            },
        })
    }
}

/// Reads `LOG_JSON`
pub fn log_json_from_env() -> bool {
    env::var("LOG_JSON")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Parses an optional environment variable, falling back to `default`
pub fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.app_url, "http://localhost:8080");
        assert_eq!(config.session_ttl, Duration::from_secs(3600));
        assert_eq!(config.operation_timeout, Duration::from_secs(10));
        assert_eq!(config.notification_stream, "notifications:outbound");
        assert_eq!(config.password, PasswordParams::default());
    }

    #[test]
    fn test_parse_var_missing_uses_default() {
        let value: u64 = parse_var("TASKFORGE_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
