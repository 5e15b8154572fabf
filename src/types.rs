//! Error types shared across the crate.

use hyper::StatusCode;
use thiserror::Error;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum ContracterError {
    /// Malformed caller input (bad email, bad JSON, bad ABI arguments)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing/invalid/expired token, signer-address mismatch.
    /// Deliberately uninformative when rendered to callers.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Duplicate resource (email already registered)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unknown resource (activation token, account)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Broken or incomplete startup configuration (unparseable ABI, bad bytecode)
    #[error("Configuration error: {0}")]
    Config(String),

    /// MongoDB failure
    #[error("Database error: {0}")]
    Database(String),

    /// Custody service unreachable or rejected the request
    #[error("Custody service error: {0}")]
    Custody(String),

    /// Chain node unreachable or rejected the transaction
    #[error("Chain error: {0}")]
    Chain(String),

    /// Assembled signature failed recovery against the expected sender.
    /// Must never be suppressed or retried with a different address.
    #[error("Signature error: {0}")]
    Signature(String),

    /// HTTP-level request problem (unreadable body, oversized payload)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ContracterError {
    /// HTTP status this error renders as.
    ///
    /// Remote dependency failures map to 502 so a single bad request can
    /// never take the process down.
    pub fn status(&self) -> StatusCode {
        match self {
            ContracterError::Validation(_) | ContracterError::Http(_) => StatusCode::BAD_REQUEST,
            ContracterError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ContracterError::Conflict(_) => StatusCode::CONFLICT,
            ContracterError::NotFound(_) => StatusCode::NOT_FOUND,
            ContracterError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            ContracterError::Custody(_) | ContracterError::Chain(_) => StatusCode::BAD_GATEWAY,
            ContracterError::Config(_)
            | ContracterError::Signature(_)
            | ContracterError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for ContracterError {
    fn from(e: std::io::Error) -> Self {
        ContracterError::Internal(format!("IO error: {}", e))
    }
}

impl From<reqwest::Error> for ContracterError {
    fn from(e: reqwest::Error) -> Self {
        ContracterError::Custody(format!("HTTP request failed: {}", e))
    }
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, ContracterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ContracterError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ContracterError::Unauthorized("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ContracterError::Conflict("x".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ContracterError::Custody("x".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ContracterError::Signature("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
