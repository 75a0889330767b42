//! Client error types

use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The probe completed but the platform did not hand out a session
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The platform redirected an authenticated call to its login page
    #[error("Session expired: redirected to {location}")]
    SessionExpired { location: String },

    /// Expected JSON or page markers were not found
    #[error("Malformed response: {context} (response length was {length})")]
    MalformedResponse { context: String, length: usize },

    /// Non-zero `returnCode`
    #[error("Server rejected request: {0}")]
    ServerRejected(String),

    /// Server returned a non-success, non-redirect status
    #[error("Server error {status}: {message}")]
    Status { status: u16, message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Invalid domain value such as an unknown permission alias
    #[error(transparent)]
    Core(#[from] cuic_core::Error),
}

impl ClientError {
    pub fn malformed(context: impl Into<String>, length: usize) -> Self {
        Self::MalformedResponse {
            context: context.into(),
            length,
        }
    }

    /// The one condition a caller may answer by re-authenticating and retrying
    pub const fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }
}

impl From<config::ConfigError> for ClientError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}
