//! Error types for quire-site
//!
//! Every store-facing operation returns [`SiteResult`]; nothing here
//! terminates the process. Callers render the message and re-enable
//! whatever control triggered the operation.

use thiserror::Error;

/// Site error taxonomy
#[derive(Debug, Error)]
pub enum SiteError {
    /// Document or record absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network failure, timeout, or a response without a usable message.
    /// Retryable; never retried automatically.
    #[error("Content store unavailable: {0}")]
    StoreUnavailable(String),

    /// The provider refused the request (stale revision token, validation,
    /// authorization). `message` is the provider's own text.
    #[error("Write rejected ({status}): {message}")]
    WriteRejected { status: u16, message: String },

    /// A write was attempted with no session token
    #[error("Authentication required: log in with an access token first")]
    AuthRequired,

    /// A write-sequence is already in flight from this client
    #[error("Another save is still in progress")]
    Busy,

    /// The edit buffer cannot be saved as-is
    #[error("Invalid draft: {0}")]
    InvalidDraft(String),

    /// quire-common error (configuration, preferences I/O)
    #[error(transparent)]
    Common(#[from] quire_common::Error),
}

impl SiteError {
    /// Whether the same request may succeed if simply tried again
    pub fn is_retryable(&self) -> bool {
        matches!(self, SiteError::StoreUnavailable(_) | SiteError::Busy)
    }
}

/// Result type for site operations
pub type SiteResult<T> = Result<T, SiteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_rejected_shows_provider_message_verbatim() {
        let err = SiteError::WriteRejected {
            status: 409,
            message: "poems.json does not match abc123".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Write rejected (409): poems.json does not match abc123"
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(SiteError::StoreUnavailable("timeout".to_string()).is_retryable());
        assert!(SiteError::Busy.is_retryable());
        assert!(!SiteError::AuthRequired.is_retryable());
        assert!(!SiteError::NotFound("1".to_string()).is_retryable());
    }

    #[test]
    fn test_common_error_converts() {
        let err: SiteError = quire_common::Error::Config("bad".to_string()).into();
        assert_eq!(err.to_string(), "Configuration error: bad");
    }
}
