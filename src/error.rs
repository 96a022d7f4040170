//! Huginn error types

use std::time::Duration;

/// Huginn error types.
///
/// Three variants are *user-facing*: [`LocalRateLimited`](Self::LocalRateLimited),
/// [`ProviderRateLimited`](Self::ProviderRateLimited) and
/// [`InvalidCredential`](Self::InvalidCredential). Only those cross the
/// public request boundary of [`AiGateway`](crate::AiGateway); every other
/// variant is degraded to `Ok(None)` before it reaches the caller.
///
/// The type is `Clone` so a single in-flight result can be handed to every
/// caller waiting on the same request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HuginnError {
    // User-facing
    #[error("too many AI requests, please wait {retry_after:?} before trying again")]
    LocalRateLimited { retry_after: Duration },

    #[error("AI provider rate limit exceeded, please try again later")]
    ProviderRateLimited { retry_after: Option<Duration> },

    #[error("invalid AI provider credential")]
    InvalidCredential,

    // Provider/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    // Data errors
    #[error("JSON error: {0}")]
    Json(String),

    // Infrastructure errors
    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl HuginnError {
    /// Whether this error carries a message worth showing to an end user.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            HuginnError::LocalRateLimited { .. }
                | HuginnError::ProviderRateLimited { .. }
                | HuginnError::InvalidCredential
        )
    }

    /// Whether retrying the same request could succeed.
    ///
    /// Authentication problems, local throttling and configuration errors
    /// are permanent for the purposes of a single call; 5xx responses,
    /// network faults and unreadable bodies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            HuginnError::ProviderRateLimited { .. }
            | HuginnError::Http(_)
            | HuginnError::Json(_) => true,
            HuginnError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Server- or limiter-provided hint for how long to wait.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            HuginnError::LocalRateLimited { retry_after } => Some(*retry_after),
            HuginnError::ProviderRateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for HuginnError {
    fn from(err: serde_json::Error) -> Self {
        HuginnError::Json(err.to_string())
    }
}

impl From<reqwest::Error> for HuginnError {
    fn from(err: reqwest::Error) -> Self {
        HuginnError::Http(err.to_string())
    }
}

/// Result type alias for Huginn operations
pub type Result<T> = std::result::Result<T, HuginnError>;
