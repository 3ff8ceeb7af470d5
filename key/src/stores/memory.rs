//! In-memory key store for tests.

use super::{KeyStore, NewAccessKey};
use crate::error::Result;
use crate::model::AccessKey;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// [`KeyStore`] keeping keys in a `HashMap` keyed by reservation.
///
/// Enforces the same one-key-per-reservation rule as the Postgres schema.
#[derive(Clone, Default)]
pub struct InMemoryKeyStore {
    keys: Arc<Mutex<HashMap<Uuid, AccessKey>>>,
}

impl InMemoryKeyStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys, revoked included.
    pub async fn len(&self) -> usize {
        self.keys.lock().await.len()
    }

    /// Whether the store has no keys.
    pub async fn is_empty(&self) -> bool {
        self.keys.lock().await.is_empty()
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn create_or_existing(&self, key: NewAccessKey) -> Result<(AccessKey, bool)> {
        let mut keys = self.keys.lock().await;
        if let Some(existing) = keys.get(&key.reservation_id) {
            return Ok((existing.clone(), false));
        }

        let stored = AccessKey {
            id: Uuid::new_v4(),
            reservation_id: key.reservation_id,
            user_id: key.user_id,
            key_code: key.key_code,
            device_id: key.device_id,
            valid_from: key.valid_from,
            valid_until: key.valid_until,
            created_at: chrono::Utc::now(),
        };
        keys.insert(key.reservation_id, stored.clone());
        Ok((stored, true))
    }

    async fn revoke(&self, reservation_id: Uuid) -> Result<bool> {
        let now = chrono::Utc::now();
        let mut keys = self.keys.lock().await;
        match keys.get_mut(&reservation_id) {
            Some(key) if key.valid_until > now => {
                key.valid_until = now;
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    async fn list_valid_for_user(&self, user_id: Uuid) -> Result<Vec<AccessKey>> {
        let now = chrono::Utc::now();
        let mut valid: Vec<AccessKey> = self
            .keys
            .lock()
            .await
            .values()
            .filter(|k| k.user_id == user_id && k.valid_until > now)
            .cloned()
            .collect();
        valid.sort_by(|a, b| a.valid_from.cmp(&b.valid_from));
        Ok(valid)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

    use super::*;
    use chrono::{Duration, Utc};

    fn new_key(reservation_id: Uuid, user_id: Uuid) -> NewAccessKey {
        NewAccessKey {
            reservation_id,
            user_id,
            key_code: "1234".to_string(),
            device_id: "smart-lock-device-001".to_string(),
            valid_from: Utc::now() - Duration::hours(1),
            valid_until: Utc::now() + Duration::hours(24),
        }
    }

    #[tokio::test]
    async fn second_create_returns_the_first_key() {
        let store = InMemoryKeyStore::new();
        let reservation_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let (first, created) = store
            .create_or_existing(new_key(reservation_id, user_id))
            .await
            .unwrap();
        assert!(created);

        let mut duplicate = new_key(reservation_id, user_id);
        duplicate.key_code = "9999".to_string();
        let (second, created) = store.create_or_existing(duplicate).await.unwrap();
        assert!(!created);
        assert_eq!(second, first);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn revoke_ends_validity_and_is_idempotent() {
        let store = InMemoryKeyStore::new();
        let reservation_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        store
            .create_or_existing(new_key(reservation_id, user_id))
            .await
            .unwrap();

        assert!(store.revoke(reservation_id).await.unwrap());
        assert!(store.list_valid_for_user(user_id).await.unwrap().is_empty());

        // Already revoked: a no-op, not an error.
        assert!(!store.revoke(reservation_id).await.unwrap());
        // Unknown reservation: same.
        assert!(!store.revoke(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn listing_filters_by_user_and_validity() {
        let store = InMemoryKeyStore::new();
        let user_id = Uuid::new_v4();

        store
            .create_or_existing(new_key(Uuid::new_v4(), user_id))
            .await
            .unwrap();
        store
            .create_or_existing(new_key(Uuid::new_v4(), Uuid::new_v4()))
            .await
            .unwrap();

        let mut expired = new_key(Uuid::new_v4(), user_id);
        expired.valid_until = Utc::now() - Duration::hours(1);
        store.create_or_existing(expired).await.unwrap();

        let valid = store.list_valid_for_user(user_id).await.unwrap();
        assert_eq!(valid.len(), 1);
    }
}
