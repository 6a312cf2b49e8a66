//! API error types

use thiserror::Error;

/// Errors surfaced by the API client
///
/// Cloneable so a single refresh failure can be delivered to every request
/// that was waiting on the refresh.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Network or protocol failure before an HTTP status was obtained
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server rejected the credentials with 401 Unauthorized
    #[error("Authentication expired: {0}")]
    AuthExpired(String),

    /// The server rejected the request with 403 Forbidden
    #[error("Access forbidden: {0}")]
    AuthForbidden(String),

    /// The token refresh flow failed; the session is over
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// Any other non-success HTTP status
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message from the response body, or the status text
        message: String,
    },

    /// Client-side input validation failed before any request was sent
    #[error("Validation error: {0}")]
    Validation(String),
}

impl ApiError {
    /// Map a non-success HTTP status and its message to an error variant
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => ApiError::AuthExpired(message),
            403 => ApiError::AuthForbidden(message),
            _ => ApiError::Server { status, message },
        }
    }

    /// The HTTP status this error corresponds to, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::AuthExpired(_) => Some(401),
            ApiError::AuthForbidden(_) => Some(403),
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
