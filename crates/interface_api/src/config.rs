//! API configuration

use serde::Deserialize;
use thiserror::Error;

use core_kernel::{Currency, Timezone};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    pub database_max_connections: u32,
    /// Log level
    pub log_level: String,
    /// Emit JSON log lines
    pub log_json: bool,
    /// Currency every amount is held in
    pub currency: Currency,
    /// IANA name of the timezone that defines the business date
    pub business_timezone: String,
    /// How many days ahead the renewal job looks for expiring packages
    pub renewal_horizon_days: u32,
    /// Local hour (0..=23) at which the daily renewal jobs run
    pub renewal_job_hour: u32,
    pub renewal_jobs_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/greenpages".to_string(),
            database_max_connections: 10,
            log_level: "info".to_string(),
            log_json: false,
            currency: Currency::IQD,
            business_timezone: "Asia/Baghdad".to_string(),
            renewal_horizon_days: 30,
            renewal_job_hour: 2,
            renewal_jobs_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_`-prefixed environment variables
    ///
    /// Unset keys keep their default values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = ApiConfig::default();
        let config = config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("jwt_secret", defaults.jwt_secret)?
            .set_default("jwt_expiration_secs", defaults.jwt_expiration_secs)?
            .set_default("database_url", defaults.database_url)?
            .set_default("database_max_connections", i64::from(defaults.database_max_connections))?
            .set_default("log_level", defaults.log_level)?
            .set_default("log_json", defaults.log_json)?
            .set_default("currency", defaults.currency.code())?
            .set_default("business_timezone", defaults.business_timezone)?
            .set_default("renewal_horizon_days", i64::from(defaults.renewal_horizon_days))?
            .set_default("renewal_job_hour", i64::from(defaults.renewal_job_hour))?
            .set_default("renewal_jobs_enabled", defaults.renewal_jobs_enabled)?
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?;

        let config: ApiConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timezone()?;
        if self.renewal_job_hour > 23 {
            return Err(ConfigError::Invalid(format!(
                "renewal_job_hour must be 0..=23, got {}",
                self.renewal_job_hour
            )));
        }
        if !(1..=365).contains(&self.renewal_horizon_days) {
            return Err(ConfigError::Invalid(format!(
                "renewal_horizon_days must be 1..=365, got {}",
                self.renewal_horizon_days
            )));
        }
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::Invalid("jwt_secret must not be empty".into()));
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<Timezone, ConfigError> {
        self.business_timezone
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("business_timezone: {}", e)))
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ApiConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.timezone().unwrap().name(), "Asia/Baghdad");
    }

    #[test]
    fn test_rejects_bad_timezone() {
        let config = ApiConfig {
            business_timezone: "Mars/Olympus".into(),
            ..ApiConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_bad_hour_and_horizon() {
        let late = ApiConfig {
            renewal_job_hour: 24,
            ..ApiConfig::default()
        };
        assert!(late.validate().is_err());

        let no_horizon = ApiConfig {
            renewal_horizon_days: 0,
            ..ApiConfig::default()
        };
        assert!(no_horizon.validate().is_err());
    }
}
