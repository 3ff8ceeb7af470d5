//! Reservation persistence.

use crate::error::Result;
use crate::model::Reservation;
use async_trait::async_trait;
use uuid::Uuid;

mod postgres;
pub use postgres::PostgresReservationStore;

#[cfg(any(test, feature = "test-utils"))]
mod memory;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryReservationStore;

/// Storage interface for reservations.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Persist a new reservation.
    async fn create(&self, reservation: &Reservation) -> Result<()>;

    /// Look up a reservation by id.
    async fn get(&self, id: Uuid) -> Result<Option<Reservation>>;

    /// All reservations belonging to a user, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Reservation>>;
}
