//! Error types for the key provisioner.

use thiserror::Error;
use tonic::Status;

/// Result type alias for key provisioner operations.
pub type Result<T> = std::result::Result<T, KeyError>;

/// Error taxonomy for the key provisioner.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// A required request field was empty or missing.
    #[error("{field} is required")]
    MissingField {
        /// Name of the missing field
        field: &'static str,
    },

    /// The validity window is not chronologically ordered.
    #[error("valid_until must be after valid_from")]
    InvalidValidityWindow,

    /// The reservation to key does not exist (yet).
    ///
    /// Can legitimately race against visibility of a just-committed
    /// reservation; the event consumer treats it as retryable.
    #[error("reservation not found")]
    ReservationNotFound,

    /// The reservation ledger could not be reached.
    #[error("reservation lookup failed: {0}")]
    Dependency(String),

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),
}

impl From<KeyError> for Status {
    fn from(err: KeyError) -> Self {
        match &err {
            KeyError::MissingField { .. } | KeyError::InvalidValidityWindow => {
                Status::invalid_argument(err.to_string())
            },
            KeyError::ReservationNotFound => Status::not_found(err.to_string()),
            // Internal detail stays in the logs, not on the wire.
            KeyError::Dependency(_) | KeyError::Database(_) => Status::internal("internal error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_window_errors_are_invalid_argument() {
        let status = Status::from(KeyError::InvalidValidityWindow);
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn database_detail_never_reaches_the_wire() {
        let status = Status::from(KeyError::Database("relation missing".into()));
        assert_eq!(status.code(), tonic::Code::Internal);
        assert!(!status.message().contains("relation"));
    }
}
