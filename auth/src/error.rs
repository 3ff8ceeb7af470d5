//! Error types for the token authority.

use thiserror::Error;
use tonic::Status;

/// Result type alias for token authority operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Error taxonomy for the token authority.
///
/// The variants map onto the platform-wide gRPC status convention:
/// validation problems are `InvalidArgument` with field detail, credential
/// problems are a single generic `Unauthenticated`, duplicates are
/// `AlreadyExists`, and infrastructure failures are a generalized
/// `Internal` that never echoes backend detail to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// A required request field was empty.
    #[error("{field} is required")]
    MissingField {
        /// Name of the empty field
        field: &'static str,
    },

    /// The password does not satisfy the policy.
    ///
    /// Lists every unmet requirement so the caller can fix all of them in
    /// one round trip.
    #[error("password must contain {}", .missing.join(", "))]
    WeakPassword {
        /// Every unmet requirement, e.g. "an uppercase letter"
        missing: Vec<String>,
    },

    /// Unknown email or wrong password.
    ///
    /// Deliberately one variant for both causes: the login error must not
    /// reveal whether the email exists.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The email is already registered.
    #[error("email already registered")]
    EmailTaken,

    /// Password hashing failed.
    #[error("failed to process password")]
    HashingFailed,

    /// Token signing failed.
    #[error("failed to generate token")]
    TokenIssueFailed,

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),
}

impl From<AuthError> for Status {
    fn from(err: AuthError) -> Self {
        match &err {
            AuthError::MissingField { .. } | AuthError::WeakPassword { .. } => {
                Status::invalid_argument(err.to_string())
            },
            AuthError::InvalidCredentials => Status::unauthenticated(err.to_string()),
            AuthError::EmailTaken => Status::already_exists(err.to_string()),
            // Internal detail stays in the logs, not on the wire.
            AuthError::HashingFailed | AuthError::TokenIssueFailed | AuthError::Database(_) => {
                Status::internal("internal error")
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weak_password_lists_every_missing_requirement() {
        let err = AuthError::WeakPassword {
            missing: vec![
                "an uppercase letter".to_string(),
                "a number".to_string(),
                "a special character".to_string(),
            ],
        };
        let message = err.to_string();
        assert!(message.contains("uppercase letter"));
        assert!(message.contains("number"));
        assert!(message.contains("special character"));
    }

    #[test]
    fn database_detail_never_reaches_the_wire() {
        let status = Status::from(AuthError::Database("connection refused at 10.0.0.7".into()));
        assert_eq!(status.code(), tonic::Code::Internal);
        assert!(!status.message().contains("10.0.0.7"));
    }

    #[test]
    fn credential_errors_are_unauthenticated() {
        let status = Status::from(AuthError::InvalidCredentials);
        assert_eq!(status.code(), tonic::Code::Unauthenticated);
    }
}
