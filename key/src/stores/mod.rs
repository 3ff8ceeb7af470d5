//! Access key persistence.

use crate::error::Result;
use crate::model::AccessKey;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

mod postgres;
pub use postgres::PostgresKeyStore;

#[cfg(any(test, feature = "test-utils"))]
mod memory;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryKeyStore;

/// Fields for a new key; the store assigns id and creation time.
#[derive(Debug, Clone)]
pub struct NewAccessKey {
    /// The reservation this key belongs to.
    pub reservation_id: Uuid,
    /// The guest who can use the key.
    pub user_id: Uuid,
    /// The door code.
    pub key_code: String,
    /// The smart lock the code is programmed into.
    pub device_id: String,
    /// Start of the validity window.
    pub valid_from: DateTime<Utc>,
    /// End of the validity window.
    pub valid_until: DateTime<Utc>,
}

/// Storage interface for access keys.
///
/// The store enforces one key per reservation: inserts race safely, and
/// whichever insert loses observes the winner's key. This is what makes
/// duplicate event deliveries harmless.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Insert a key, or return the reservation's existing key.
    ///
    /// The boolean is `true` when this call created the key.
    async fn create_or_existing(&self, key: NewAccessKey) -> Result<(AccessKey, bool)>;

    /// End the validity of a reservation's still-valid key.
    ///
    /// Returns `false` when the reservation has no valid key; callers
    /// treat that as a no-op, not a failure.
    async fn revoke(&self, reservation_id: Uuid) -> Result<bool>;

    /// Currently valid keys for a user.
    async fn list_valid_for_user(&self, user_id: Uuid) -> Result<Vec<AccessKey>>;
}
