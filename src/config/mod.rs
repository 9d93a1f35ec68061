//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file. The sandbox API key is read
//! from `ARBFLOW_SANDBOX_API_KEY` and never from the file.
//!
//! # Example
//!
//! ```no_run
//! use arbflow::config::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

mod logging;
mod run;

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

pub use logging::LoggingConfig;
pub use run::{CommissionConfig, InvestmentConfig, InvestmentMode, RunConfig, SlippageConfig};

use crate::error::{ConfigError, Result};

/// Environment variable holding the sandbox API key.
pub const SANDBOX_API_KEY_ENV: &str = "ARBFLOW_SANDBOX_API_KEY";

/// Remote paper-trading endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SandboxConfig {
    #[serde(default = "default_sandbox_url")]
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_sandbox_timeout_ms")]
    pub timeout_ms: u64,
    /// Loaded from the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
}

fn default_sandbox_url() -> String {
    "http://127.0.0.1:8700".to_string()
}

const fn default_sandbox_timeout_ms() -> u64 {
    5_000
}

impl SandboxConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            base_url: default_sandbox_url(),
            timeout_ms: default_sandbox_timeout_ms(),
            api_key: None,
        }
    }
}

/// Persistence settings. Without a path, state lives in memory only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    #[serde(default)]
    pub path: Option<String>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.sandbox.api_key = std::env::var(SANDBOX_API_KEY_ENV)
            .ok()
            .filter(|key| !key.is_empty());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is malformed
    /// or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        if !self.logging.is_known_format() {
            return Err(ConfigError::InvalidValue {
                field: "logging.format",
                reason: "must be 'pretty' or 'json'".to_string(),
            }
            .into());
        }
        self.run.validate()?;
        if self.sandbox.base_url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "sandbox.base_url",
            }
            .into());
        }
        url::Url::parse(&self.sandbox.base_url).map_err(|e| ConfigError::InvalidValue {
            field: "sandbox.base_url",
            reason: e.to_string(),
        })?;
        if self.sandbox.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sandbox.timeout_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if matches!(self.store.path.as_deref(), Some("")) {
            return Err(ConfigError::InvalidValue {
                field: "store.path",
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Initialize logging from the `[logging]` section.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.run.max_concurrent_operations, 5);
        assert!(config.store.path.is_none());
    }

    #[test]
    fn full_file_parses() {
        let config = Config::parse_toml(
            r#"
            [logging]
            level = "debug"
            format = "json"

            [run]
            initial_balance = "2500"
            stop_loss_pct = "3"
            leg_delay_ms = 10

            [run.commission]
            buy_rate = "0.002"

            [sandbox]
            base_url = "https://paper.example.com"
            timeout_ms = 2000

            [store]
            path = "arbflow.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.run.initial_balance, dec!(2500));
        assert_eq!(config.run.commission.buy_rate, dec!(0.002));
        assert_eq!(config.run.commission.sell_rate, dec!(0.001));
        assert_eq!(config.sandbox.timeout(), Duration::from_secs(2));
        assert_eq!(config.store.path.as_deref(), Some("arbflow.db"));
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let err = Config::parse_toml("[logging]\nformat = \"xml\"").unwrap_err();
        assert!(err.to_string().contains("logging.format"));
    }

    #[test]
    fn bad_sandbox_url_is_rejected() {
        assert!(Config::parse_toml("[sandbox]\nbase_url = \"not a url\"").is_err());
    }

    #[test]
    fn invalid_run_section_is_rejected() {
        assert!(Config::parse_toml("[run]\nmax_concurrent_operations = 0").is_err());
    }
}
