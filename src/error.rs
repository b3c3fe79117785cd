//! Error types and handling for `AqiRoute`

use std::fmt;
use thiserror::Error;

/// Classification of an upstream (remote service) failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Connection could not be established or was dropped
    Network,
    /// The call did not complete within the caller-supplied timeout
    Timeout,
    /// Non-success HTTP status not covered by a more specific code
    HttpStatus(u16),
    /// HTTP 429 from the provider
    RateLimited,
    /// HTTP 401/403, usually a bad API key
    Unauthorized,
    /// HTTP 404
    NotFound,
    /// Body was not the JSON shape we expected
    MalformedPayload,
}

impl ErrorCode {
    /// Whether repeating the same call later could plausibly succeed
    #[must_use]
    pub fn is_transient(self) -> bool {
        match self {
            ErrorCode::Network | ErrorCode::Timeout | ErrorCode::RateLimited => true,
            ErrorCode::HttpStatus(status) => status >= 500,
            ErrorCode::Unauthorized | ErrorCode::NotFound | ErrorCode::MalformedPayload => false,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Network => write!(f, "network"),
            ErrorCode::Timeout => write!(f, "timeout"),
            ErrorCode::HttpStatus(status) => write!(f, "http {status}"),
            ErrorCode::RateLimited => write!(f, "rate limited"),
            ErrorCode::Unauthorized => write!(f, "unauthorized"),
            ErrorCode::NotFound => write!(f, "not found"),
            ErrorCode::MalformedPayload => write!(f, "malformed payload"),
        }
    }
}

/// Main error type for the `AqiRoute` library
#[derive(Error, Debug)]
pub enum AirError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A remote collaborator failed (network, HTTP, payload)
    #[error("Upstream failure ({code}): {message}")]
    Upstream {
        code: ErrorCode,
        message: String,
    },

    /// Pollutant payload lacked one or more of the eight required pollutants
    #[error("Incomplete pollutant snapshot, missing or invalid: {}", missing.join(", "))]
    IncompleteSnapshot { missing: Vec<String> },

    /// The AQI estimator rejected its input
    #[error("AQI estimation failed: {message}")]
    EstimationFailure { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// The caller cancelled the pipeline before the next sample point
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl AirError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new upstream failure
    pub fn upstream<S: Into<String>>(code: ErrorCode, message: S) -> Self {
        Self::Upstream {
            code,
            message: message.into(),
        }
    }

    /// Create a new estimation failure
    pub fn estimation<S: Into<String>>(message: S) -> Self {
        Self::EstimationFailure {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Upstream code, if this is an upstream failure
    #[must_use]
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            AirError::Upstream { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the presentation layer should offer a retry
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.code().is_some_and(ErrorCode::is_transient)
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            AirError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            AirError::Upstream { code, .. } if code.is_transient() => {
                "Unable to reach the air-quality services right now. Please try again.".to_string()
            }
            AirError::Upstream { code: ErrorCode::Unauthorized, .. } => {
                "An external service rejected the API key. Please check your configuration."
                    .to_string()
            }
            AirError::Upstream { .. } => {
                "An external service returned data we could not use.".to_string()
            }
            AirError::IncompleteSnapshot { .. } => {
                "Pollutant data for this location is incomplete.".to_string()
            }
            AirError::EstimationFailure { .. } => {
                "The AQI model could not produce an estimate.".to_string()
            }
            AirError::Validation { message } => format!("Invalid input: {message}"),
            AirError::Cancelled => "Request cancelled.".to_string(),
            AirError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}
