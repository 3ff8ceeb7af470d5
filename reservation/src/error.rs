//! Error types for the reservation ledger.

use thiserror::Error;
use tonic::Status;

/// Result type alias for reservation ledger operations.
pub type Result<T> = std::result::Result<T, ReservationError>;

/// Error taxonomy for the reservation ledger.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReservationError {
    /// A required request field was empty or missing.
    #[error("{field} is required")]
    MissingField {
        /// Name of the missing field
        field: &'static str,
    },

    /// The stay window is not chronologically ordered.
    #[error("end_date must be after start_date")]
    InvalidStayWindow,

    /// No reservation with the requested id.
    #[error("reservation not found")]
    NotFound,

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),
}

impl From<ReservationError> for Status {
    fn from(err: ReservationError) -> Self {
        match &err {
            ReservationError::MissingField { .. } | ReservationError::InvalidStayWindow => {
                Status::invalid_argument(err.to_string())
            },
            ReservationError::NotFound => Status::not_found(err.to_string()),
            // Internal detail stays in the logs, not on the wire.
            ReservationError::Database(_) => Status::internal("internal error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stay_window_errors_are_invalid_argument() {
        let status = Status::from(ReservationError::InvalidStayWindow);
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn database_detail_never_reaches_the_wire() {
        let status = Status::from(ReservationError::Database("pool timed out".into()));
        assert_eq!(status.code(), tonic::Code::Internal);
        assert!(!status.message().contains("pool"));
    }
}
