//! Error types for Mastery

use thiserror::Error;

/// Result type alias using Mastery's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Mastery error types with helpful messages and suggestions
///
/// Errors are `Clone` because one in-flight request may be shared by several
/// readers of the same cache key, and each of them receives the failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Transport errors (E100-E199)
    #[error("Network error: {0}. Check your connection and the configured API URL.")]
    Transport(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    // Shape errors (E200-E299)
    #[error("Malformed {entity} payload: missing required field '{field}'")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    // Domain contract errors (E300-E399)
    #[error("Answer of type '{found}' cannot answer a '{expected}' question")]
    VariantMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Option {index} is out of range (question has {available} options)")]
    OptionOutOfRange { index: usize, available: usize },

    // Cache errors (E400-E499)
    #[error("Cached value under {key} has an unexpected type")]
    CacheTypeMismatch { key: String },

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "E100",
            Self::Http { .. } => "E101",
            Self::MissingField { .. } => "E200",
            Self::InvalidPayload(_) => "E201",
            Self::VariantMismatch { .. } => "E300",
            Self::OptionOutOfRange { .. } => "E301",
            Self::CacheTypeMismatch { .. } => "E400",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Transport(_) => Some("mastery config get api.base_url".to_string()),
            Self::Http { status: 404, .. } => {
                Some("Check the id with `mastery courses list` or `mastery graphs list`".to_string())
            }
            Self::Http { status, .. } if *status >= 500 => {
                Some("The server failed; retry the command".to_string())
            }
            Self::ConfigError(_) => Some("mastery config list".to_string()),
            _ => None,
        }
    }

    /// Whether this error came from the transport layer (connection or HTTP status)
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http { .. })
    }

    /// Whether this error means a payload could not be mapped into the domain model
    pub fn is_shape(&self) -> bool {
        matches!(self, Self::MissingField { .. } | Self::InvalidPayload(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Http {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => Self::Transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidPayload(err.to_string())
    }
}
