//! In-memory reservation store for tests.

use super::ReservationStore;
use crate::error::Result;
use crate::model::Reservation;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// [`ReservationStore`] keeping reservations in a `Vec`.
#[derive(Clone, Default)]
pub struct InMemoryReservationStore {
    reservations: Arc<Mutex<Vec<Reservation>>>,
}

impl InMemoryReservationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored reservations.
    pub async fn len(&self) -> usize {
        self.reservations.lock().await.len()
    }

    /// Whether the store has no reservations.
    pub async fn is_empty(&self) -> bool {
        self.reservations.lock().await.is_empty()
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn create(&self, reservation: &Reservation) -> Result<()> {
        self.reservations.lock().await.push(reservation.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Reservation>> {
        Ok(self
            .reservations
            .lock()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Reservation>> {
        let mut matching: Vec<Reservation> = self
            .reservations
            .lock()
            .await
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }
}
