//! Error types for credential operations.

use thiserror::Error;

/// Failure taxonomy for the token lifecycle.
///
/// Components return these variants directly rather than opaque failures so
/// callers can make policy decisions (re-run the authorization flow, retry
/// with backoff, or give up) without string matching.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No stored grant for the user; run the authorization flow first.
    #[error("Not authorized: no stored grant for this user")]
    NotAuthorized,

    /// The authorization server rejected the refresh token. The stored grant
    /// has been purged; the user must consent again.
    #[error("Reauthorization required: refresh token rejected by the server")]
    ReauthorizationRequired,

    /// Transient network or server failure. The caller decides retry policy;
    /// nothing is retried internally.
    #[error("Retryable error: {0}")]
    Retryable(String),

    /// Local persistence failure. Fatal to the current operation.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The user denied the authorization request.
    #[error("Authorization denied by the user")]
    FlowDenied,

    /// The authorization flow hit its deadline before the user consented.
    #[error("Authorization flow timed out")]
    FlowTimeout,

    /// The server returned something the bridge could not interpret.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AuthError {
    /// Whether the caller may reasonably retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Retryable(error.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for AuthError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::ser::Error> for AuthError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, AuthError>;
