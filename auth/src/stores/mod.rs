//! User persistence.
//!
//! The service is generic over [`UserStore`]; production wires in
//! [`PostgresUserStore`], tests use [`InMemoryUserStore`].

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

mod postgres;
pub use postgres::PostgresUserStore;

#[cfg(any(test, feature = "test-utils"))]
mod memory;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryUserStore;

/// A stored user account.
#[derive(Debug, Clone)]
pub struct User {
    /// Account id.
    pub id: Uuid,
    /// Login email, unique across accounts.
    pub email: String,
    /// Argon2 PHC hash string.
    pub password_hash: String,
    /// Display name.
    pub name: String,
    /// Role embedded in issued tokens.
    pub role: String,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
}

/// Fields for a new account; the store assigns id and creation time.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login email.
    pub email: String,
    /// Argon2 PHC hash string.
    pub password_hash: String,
    /// Display name.
    pub name: String,
    /// Initial role.
    pub role: String,
}

/// Storage interface for user accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new account.
    ///
    /// Returns [`crate::error::AuthError::EmailTaken`] when the email is
    /// already registered.
    async fn create(&self, user: NewUser) -> Result<User>;

    /// Look up an account by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
}
