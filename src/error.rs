//! Error types and handling for the forecast engine

use thiserror::Error;

/// Coarse classification of a [`ForecastError`], for callers that map errors
/// onto their own transport (status codes, exit codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    UpstreamTransient,
    UpstreamPermanent,
    Config,
}

/// Main error type for the forecast engine
#[derive(Error, Debug)]
pub enum ForecastError {
    /// Unknown location, or no forecast data for the requested instant
    #[error("{entity} not found: {value}")]
    NotFound { entity: String, value: String },

    /// Malformed request input, rejected before any I/O
    #[error("Invalid {field} '{value}': expected {expected}")]
    InvalidInput {
        field: String,
        value: String,
        expected: String,
    },

    /// Provider rate-limited or unavailable after all retries
    #[error("Upstream {provider} unavailable after {attempts} attempt(s): {message}")]
    UpstreamTransient {
        provider: String,
        attempts: u32,
        message: String,
    },

    /// Malformed provider response or non-retryable upstream failure
    #[error("Upstream {provider} failed: {message}")]
    UpstreamPermanent { provider: String, message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ForecastError {
    /// Create a new not-found error
    pub fn not_found<E: Into<String>, V: Into<String>>(entity: E, value: V) -> Self {
        Self::NotFound {
            entity: entity.into(),
            value: value.into(),
        }
    }

    /// Create a new invalid-input error carrying the offending value and the valid bounds
    pub fn invalid_input<F, V, X>(field: F, value: V, expected: X) -> Self
    where
        F: Into<String>,
        V: Into<String>,
        X: Into<String>,
    {
        Self::InvalidInput {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Create a new transient upstream error
    pub fn upstream_transient<P: Into<String>, M: Into<String>>(
        provider: P,
        attempts: u32,
        message: M,
    ) -> Self {
        Self::UpstreamTransient {
            provider: provider.into(),
            attempts,
            message: message.into(),
        }
    }

    /// Create a new permanent upstream error
    pub fn upstream_permanent<P: Into<String>, M: Into<String>>(provider: P, message: M) -> Self {
        Self::UpstreamPermanent {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForecastError::NotFound { .. } => ErrorKind::NotFound,
            ForecastError::InvalidInput { .. } => ErrorKind::InvalidInput,
            ForecastError::UpstreamTransient { .. } => ErrorKind::UpstreamTransient,
            ForecastError::UpstreamPermanent { .. } => ErrorKind::UpstreamPermanent,
            ForecastError::Config { .. } => ErrorKind::Config,
        }
    }

    /// Whether repeating the same request later could succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, ForecastError::UpstreamTransient { .. })
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            ForecastError::NotFound { entity, value } => {
                format!("No {entity} found for '{value}'.")
            }
            ForecastError::InvalidInput {
                field,
                value,
                expected,
            } => format!("Invalid {field} '{value}'. Expected {expected}."),
            ForecastError::UpstreamTransient { .. } => {
                "The forecast provider is temporarily unavailable. Please try again shortly."
                    .to_string()
            }
            ForecastError::UpstreamPermanent { .. } => {
                "The forecast provider returned an unexpected response.".to_string()
            }
            ForecastError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
        }
    }
}
