use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Startup configuration failures. These are fatal: the process never
/// serves requests in a half-configured state.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("HYPERLIQUID_PRIVATE_KEY not set (set HYPERLIQUID_READ_ONLY=true to run without trading)")]
    MissingPrivateKey,

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("failed to build tool catalog: {0}")]
    Catalog(String),

    #[error("failed to build exchange client: {0}")]
    Client(String),
}

/// Violations of the exchange's tick and lot rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrecisionError {
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("{field} {value} has more than {max} decimal places")]
    TooManyDecimals {
        field: &'static str,
        value: String,
        max: u32,
    },

    #[error("{field} {value} has more than {max} significant figures")]
    TooManySignificantFigures {
        field: &'static str,
        value: String,
        max: u32,
    },

    #[error("cannot parse decimal: {0}")]
    Unparseable(String),

    #[error("decimal overflow")]
    Overflow,
}

/// The error kinds surfaced to the agent in a failed tool result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    UnknownTool,
    InvalidArguments,
    Unauthorized,
    ExchangeRejected,
    Timeout,
    TransportFailure,
    Internal,
}

impl ErrorKind {
    /// Whether the agent may safely repeat the call.
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::TransportFailure)
    }
}

/// Normalized failure of an exchange operation. Nothing collaborator
/// specific survives past this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("exchange rejected request: {0}")]
    Rejected(String),

    #[error("exchange call timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ExchangeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExchangeError::InvalidArguments(_) => ErrorKind::InvalidArguments,
            ExchangeError::Rejected(_) => ErrorKind::ExchangeRejected,
            ExchangeError::Timeout(_) => ErrorKind::Timeout,
            ExchangeError::Transport(_) => ErrorKind::TransportFailure,
            ExchangeError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The message shown to the agent, without the kind prefix.
    pub fn message(&self) -> String {
        match self {
            ExchangeError::InvalidArguments(msg)
            | ExchangeError::Rejected(msg)
            | ExchangeError::Transport(msg)
            | ExchangeError::Internal(msg) => msg.clone(),
            ExchangeError::Timeout(after) => {
                format!("exchange did not respond within {} ms", after.as_millis())
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_transient()
    }
}

impl From<PrecisionError> for ExchangeError {
    fn from(err: PrecisionError) -> Self {
        ExchangeError::InvalidArguments(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExchangeError>;
