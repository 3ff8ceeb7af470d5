//! gRPC surface of the key provisioner.

use crate::error::KeyError;
use crate::model::{self, AccessKey};
use crate::reservation_lookup::ReservationLookup;
use crate::stores::{KeyStore, NewAccessKey};
use chrono::{DateTime, Utc};
use staykey_proto::convert::{parse_uuid, require_datetime, to_timestamp};
use staykey_proto::v1::key_service_server::KeyService as KeyServiceApi;
use staykey_proto::v1::{
    GenerateKeyRequest, GenerateKeyResponse, ListKeysRequest, ListKeysResponse, RevokeKeyRequest,
    RevokeKeyResponse,
};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::info;
use uuid::Uuid;

/// Key provisioner service: door access codes for reservations.
pub struct KeyService<S: KeyStore> {
    store: Arc<S>,
    lookup: Arc<dyn ReservationLookup>,
    device_id: String,
}

impl<S: KeyStore> KeyService<S> {
    /// Create the service over a key store, a reservation lookup, and the
    /// lock device to program.
    pub fn new(
        store: Arc<S>,
        lookup: Arc<dyn ReservationLookup>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            lookup,
            device_id: device_id.into(),
        }
    }

    /// Provision a key for a reservation's stay window.
    ///
    /// Idempotent: if the reservation already has a key, that key comes
    /// back and no new code is generated. Both the RPC handler and the
    /// event consumer go through here.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidValidityWindow`] for an inverted window,
    /// [`KeyError::ReservationNotFound`] when the ledger has no such
    /// reservation (possibly not visible yet), and [`KeyError::Database`]
    /// on storage failure.
    pub async fn provision(
        &self,
        reservation_id: Uuid,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> crate::error::Result<AccessKey> {
        if valid_until <= valid_from {
            return Err(KeyError::InvalidValidityWindow);
        }

        let reservation = self
            .lookup
            .find(reservation_id)
            .await?
            .ok_or(KeyError::ReservationNotFound)?;

        let (key, created) = self
            .store
            .create_or_existing(NewAccessKey {
                reservation_id,
                user_id: reservation.user_id,
                key_code: model::generate_key_code(),
                device_id: self.device_id.clone(),
                valid_from,
                valid_until,
            })
            .await?;

        // The code itself is a credential and never appears in logs.
        if created {
            info!(
                reservation_id = %reservation_id,
                device_id = %key.device_id,
                "access key provisioned"
            );
        } else {
            info!(
                reservation_id = %reservation_id,
                "reservation already has a key, returning it"
            );
        }

        Ok(key)
    }
}

fn to_proto(key: &AccessKey) -> staykey_proto::v1::Key {
    staykey_proto::v1::Key {
        key_code: key.key_code.clone(),
        device_id: key.device_id.clone(),
        reservation_id: key.reservation_id.to_string(),
        valid_from: Some(to_timestamp(key.valid_from)),
        valid_until: Some(to_timestamp(key.valid_until)),
    }
}

#[tonic::async_trait]
impl<S: KeyStore + 'static> KeyServiceApi for KeyService<S> {
    async fn generate_key(
        &self,
        request: Request<GenerateKeyRequest>,
    ) -> Result<Response<GenerateKeyResponse>, Status> {
        let req = request.into_inner();

        let reservation_id = parse_uuid(&req.reservation_id, "reservation_id")?;
        let valid_from = require_datetime(req.valid_from.as_ref(), "valid_from")?;
        let valid_until = require_datetime(req.valid_until.as_ref(), "valid_until")?;

        let key = self.provision(reservation_id, valid_from, valid_until).await?;

        Ok(Response::new(GenerateKeyResponse {
            key_code: key.key_code,
            device_id: key.device_id,
        }))
    }

    async fn revoke_key(
        &self,
        request: Request<RevokeKeyRequest>,
    ) -> Result<Response<RevokeKeyResponse>, Status> {
        let req = request.into_inner();
        let reservation_id = parse_uuid(&req.reservation_id, "reservation_id")?;

        let revoked = self.store.revoke(reservation_id).await?;
        if revoked {
            info!(reservation_id = %reservation_id, "access key revoked");
        }

        Ok(Response::new(RevokeKeyResponse { success: revoked }))
    }

    async fn list_keys(
        &self,
        request: Request<ListKeysRequest>,
    ) -> Result<Response<ListKeysResponse>, Status> {
        let req = request.into_inner();
        let user_id = parse_uuid(&req.user_id, "user_id")?;

        let keys = self.store.list_valid_for_user(user_id).await?;

        Ok(Response::new(ListKeysResponse {
            keys: keys.iter().map(to_proto).collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

    use super::*;
    use crate::reservation_lookup::{InMemoryReservationLookup, ReservationRef};
    use crate::stores::InMemoryKeyStore;

    fn date(s: &str) -> DateTime<Utc> {
        s.parse().expect("valid timestamp")
    }

    struct Fixture {
        service: KeyService<InMemoryKeyStore>,
        lookup: Arc<InMemoryReservationLookup>,
    }

    fn fixture() -> Fixture {
        let lookup = Arc::new(InMemoryReservationLookup::new());
        let service = KeyService::new(
            Arc::new(InMemoryKeyStore::new()),
            Arc::clone(&lookup) as Arc<dyn ReservationLookup>,
            "smart-lock-device-001",
        );
        Fixture { service, lookup }
    }

    async fn known_reservation(fixture: &Fixture) -> (Uuid, Uuid) {
        let reservation_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        fixture
            .lookup
            .insert(ReservationRef {
                id: reservation_id,
                user_id,
            })
            .await;
        (reservation_id, user_id)
    }

    fn generate_request(reservation_id: Uuid) -> Request<GenerateKeyRequest> {
        Request::new(GenerateKeyRequest {
            reservation_id: reservation_id.to_string(),
            valid_from: Some(to_timestamp(date("2025-06-01T15:00:00Z"))),
            valid_until: Some(to_timestamp(date("2025-06-03T11:00:00Z"))),
        })
    }

    #[tokio::test]
    async fn generate_returns_a_pin_for_the_configured_device() {
        let fixture = fixture();
        let (reservation_id, _) = known_reservation(&fixture).await;

        let response = fixture
            .service
            .generate_key(generate_request(reservation_id))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.key_code.len(), 4);
        assert!(response.key_code.parse::<u32>().is_ok());
        assert_eq!(response.device_id, "smart-lock-device-001");
    }

    #[tokio::test]
    async fn repeated_generate_returns_the_same_key() {
        let fixture = fixture();
        let (reservation_id, _) = known_reservation(&fixture).await;

        let first = fixture
            .service
            .generate_key(generate_request(reservation_id))
            .await
            .unwrap()
            .into_inner();
        let second = fixture
            .service
            .generate_key(generate_request(reservation_id))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(first.key_code, second.key_code);
    }

    #[tokio::test]
    async fn unknown_reservation_is_not_found() {
        let fixture = fixture();

        let err = fixture
            .service
            .generate_key(generate_request(Uuid::new_v4()))
            .await
            .unwrap_err();

        assert_eq!(err.code(), tonic::Code::NotFound);
    }

    #[tokio::test]
    async fn inverted_validity_window_is_rejected() {
        let fixture = fixture();
        let (reservation_id, _) = known_reservation(&fixture).await;

        let err = fixture
            .service
            .generate_key(Request::new(GenerateKeyRequest {
                reservation_id: reservation_id.to_string(),
                valid_from: Some(to_timestamp(date("2025-06-03T11:00:00Z"))),
                valid_until: Some(to_timestamp(date("2025-06-01T15:00:00Z"))),
            }))
            .await
            .unwrap_err();

        assert_eq!(err.code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn revoke_then_list_shows_no_valid_keys() {
        let fixture = fixture();
        let (reservation_id, user_id) = known_reservation(&fixture).await;
        fixture
            .service
            .generate_key(generate_request(reservation_id))
            .await
            .unwrap();

        let revoked = fixture
            .service
            .revoke_key(Request::new(RevokeKeyRequest {
                reservation_id: reservation_id.to_string(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(revoked.success);

        let listed = fixture
            .service
            .list_keys(Request::new(ListKeysRequest {
                user_id: user_id.to_string(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(listed.keys.is_empty());
    }

    #[tokio::test]
    async fn revoking_an_unknown_reservation_is_not_an_error() {
        let fixture = fixture();

        let response = fixture
            .service
            .revoke_key(Request::new(RevokeKeyRequest {
                reservation_id: Uuid::new_v4().to_string(),
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(!response.success);
    }
}
