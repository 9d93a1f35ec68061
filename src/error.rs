use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::error::DomainError;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Failures reported by an exchange gateway or the sandbox endpoint.
///
/// A gateway error ends the leg it occurred in; the transaction is failed
/// and the position is left as-is for manual reconciliation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("exchange error: {0}")]
    Exchange(String),
}

impl GatewayError {
    /// Stable kind label used in logs and persisted reasons.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Auth(_) => "auth",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::Exchange(_) => "exchange",
        }
    }
}

/// Predictor failures. The engine never propagates these; it falls back
/// to a declining decision.
#[derive(Error, Debug, Clone)]
pub enum PredictorError {
    #[error("predictor unavailable: {0}")]
    Unavailable(String),

    #[error("invalid prediction payload: {0}")]
    InvalidPayload(String),
}

/// Reasons `process` refuses an opportunity before a transaction runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessError {
    #[error("orchestration run is not active")]
    NotRunning,

    #[error("invalid opportunity: {0}")]
    Validation(#[from] DomainError),

    #[error("concurrency limit reached ({max} operations in flight)")]
    Capacity { max: usize },

    #[error("investment {sized} below minimum {minimum}")]
    InvestmentTooSmall { sized: Decimal, minimum: Decimal },

    #[error("global stop-loss tripped")]
    GlobalStopLoss,

    #[error("run limit reached: {0}")]
    RunLimitReached(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
