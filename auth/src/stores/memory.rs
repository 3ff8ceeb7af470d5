//! In-memory user store for tests.

use super::{NewUser, User, UserStore};
use crate::error::{AuthError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// [`UserStore`] keeping accounts in a `HashMap`, keyed by email.
///
/// Enforces the same email uniqueness as the Postgres schema.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<Mutex<HashMap<String, User>>>,
}

impl InMemoryUserStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }

    /// Whether the store has no accounts.
    pub async fn is_empty(&self) -> bool {
        self.users.lock().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.lock().await;
        if users.contains_key(&user.email) {
            return Err(AuthError::EmailTaken);
        }

        let stored = User {
            id: Uuid::new_v4(),
            email: user.email.clone(),
            password_hash: user.password_hash,
            name: user.name,
            role: user.role,
            created_at: chrono::Utc::now(),
        };
        users.insert(user.email, stored.clone());
        Ok(stored)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.users.lock().await.get(email).cloned())
    }
}
