//! Reservation lookups against the reservation ledger.
//!
//! The provisioner keys a reservation it does not own, so it asks the
//! ledger whether the reservation exists and who holds it. A lookup can
//! miss for a reservation committed moments ago on another instance; the
//! event consumer treats that as retryable, not fatal.

use crate::error::{KeyError, Result};
use async_trait::async_trait;
use staykey_proto::v1::GetReservationRequest;
use staykey_proto::v1::reservation_service_client::ReservationServiceClient;
use tonic::transport::{Channel, Endpoint};
use uuid::Uuid;

/// The slice of a reservation the provisioner needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationRef {
    /// Reservation id.
    pub id: Uuid,
    /// The guest who owns the reservation.
    pub user_id: Uuid,
}

/// Lookup interface against the reservation ledger.
#[async_trait]
pub trait ReservationLookup: Send + Sync {
    /// Look up a reservation; `None` when the ledger has no such row.
    async fn find(&self, id: Uuid) -> Result<Option<ReservationRef>>;
}

/// [`ReservationLookup`] over the ledger's gRPC client.
pub struct GrpcReservationLookup {
    client: ReservationServiceClient<Channel>,
}

impl GrpcReservationLookup {
    /// Connect lazily to the reservation ledger.
    ///
    /// The channel is established on first use, so the provisioner can
    /// start before the ledger does.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Dependency`] if the endpoint URL is invalid.
    pub fn connect(url: &str) -> Result<Self> {
        let channel = Endpoint::from_shared(url.to_string())
            .map_err(|e| KeyError::Dependency(e.to_string()))?
            .timeout(std::time::Duration::from_secs(5))
            .connect_lazy();

        Ok(Self {
            client: ReservationServiceClient::new(channel),
        })
    }
}

#[async_trait]
impl ReservationLookup for GrpcReservationLookup {
    async fn find(&self, id: Uuid) -> Result<Option<ReservationRef>> {
        let mut client = self.client.clone();
        let response = client
            .get_reservation(GetReservationRequest {
                reservation_id: id.to_string(),
            })
            .await;

        let reservation = match response {
            Ok(response) => response.into_inner().reservation,
            Err(status) if status.code() == tonic::Code::NotFound => return Ok(None),
            Err(status) => return Err(KeyError::Dependency(status.to_string())),
        };

        let Some(reservation) = reservation else {
            return Ok(None);
        };
        let user_id = Uuid::parse_str(&reservation.user_id)
            .map_err(|e| KeyError::Dependency(format!("malformed user_id from ledger: {e}")))?;

        Ok(Some(ReservationRef { id, user_id }))
    }
}

/// In-memory [`ReservationLookup`] for tests.
#[cfg(any(test, feature = "test-utils"))]
pub struct InMemoryReservationLookup {
    reservations: std::sync::Arc<tokio::sync::Mutex<Vec<ReservationRef>>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for InMemoryReservationLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl InMemoryReservationLookup {
    /// Create an empty lookup.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reservations: std::sync::Arc::new(tokio::sync::Mutex::new(Vec::new())),
        }
    }

    /// Make a reservation visible to subsequent lookups.
    pub async fn insert(&self, reservation: ReservationRef) {
        self.reservations.lock().await.push(reservation);
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl ReservationLookup for InMemoryReservationLookup {
    async fn find(&self, id: Uuid) -> Result<Option<ReservationRef>> {
        Ok(self
            .reservations
            .lock()
            .await
            .iter()
            .find(|r| r.id == id)
            .copied())
    }
}
