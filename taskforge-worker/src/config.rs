/// Worker configuration
///
/// # Environment Variables
///
/// - `JOB_PERIOD_SECS`: Tick period shared by all jobs (default: 60)
/// - `INACTIVITY_THRESHOLD_SECS`: Quiet time before a reminder (default: 7 days)
/// - `ANNIVERSARY_AGE_SECS`: Account age for the loyalty notice (default: 365 days)
/// - database, Redis and engine variables as for the API server

use std::time::Duration;

use taskforge_shared::config::{parse_var, EngineConfig};
use taskforge_shared::db::pool::DatabaseConfig;
use taskforge_shared::redis::RedisConfig;

/// Complete worker configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub jobs: JobConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub engine: EngineConfig,
}

/// Job timing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    pub period: Duration,
    pub inactivity_threshold: Duration,
    pub anniversary_age: Duration,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(60),
            inactivity_threshold: Duration::from_secs(7 * 24 * 3600),
            anniversary_age: Duration::from_secs(365 * 24 * 3600),
        }
    }
}

impl JobConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let period = Duration::from_secs(parse_var("JOB_PERIOD_SECS", defaults.period.as_secs())?);
        if period.is_zero() {
            anyhow::bail!("JOB_PERIOD_SECS must be greater than zero");
        }

        Ok(Self {
            period,
            inactivity_threshold: Duration::from_secs(parse_var(
                "INACTIVITY_THRESHOLD_SECS",
                defaults.inactivity_threshold.as_secs(),
            )?),
            anniversary_age: Duration::from_secs(parse_var(
                "ANNIVERSARY_AGE_SECS",
                defaults.anniversary_age.as_secs(),
            )?),
        })
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            jobs: JobConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            redis: RedisConfig::from_env()?,
            engine: EngineConfig::from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_defaults() {
        let config = JobConfig::default();
        assert_eq!(config.period, Duration::from_secs(60));
        assert_eq!(config.inactivity_threshold, Duration::from_secs(604_800));
        assert_eq!(config.anniversary_age, Duration::from_secs(31_536_000));
    }
}
