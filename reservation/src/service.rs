//! gRPC surface of the reservation ledger.

use crate::error::ReservationError;
use crate::model::{self, Reservation, ReservationStatus};
use crate::stores::ReservationStore;
use staykey_core::event::SerializedEvent;
use staykey_core::event_bus::EventBus;
use staykey_core::reservation::{RESERVATION_EVENTS_TOPIC, ReservationEvent};
use staykey_proto::convert::{parse_uuid, require_datetime, to_timestamp};
use staykey_proto::v1::reservation_service_server::ReservationService as ReservationServiceApi;
use staykey_proto::v1::{
    CreateReservationRequest, CreateReservationResponse, GetReservationRequest,
    GetReservationResponse, ListReservationsRequest, ListReservationsResponse,
};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{error, info};
use uuid::Uuid;

/// Origin attribute stamped on every published event.
const ORIGIN: &str = "reservation-service";

/// Reservation ledger service: booking records plus domain events.
pub struct ReservationService<S: ReservationStore> {
    store: Arc<S>,
    bus: Arc<dyn EventBus>,
}

impl<S: ReservationStore> ReservationService<S> {
    /// Create the service over a reservation store and event channel.
    pub fn new(store: Arc<S>, bus: Arc<dyn EventBus>) -> Self {
        Self { store, bus }
    }

    /// Publish the created event for a committed reservation.
    ///
    /// The reservation row is already durable when this runs. A publish
    /// failure is logged and swallowed: the caller still gets a successful
    /// response, and the reservation exists without its event until an
    /// operator replays it. There is no transactional outbox.
    async fn publish_created(&self, reservation: &Reservation) {
        let event = ReservationEvent::ReservationCreated {
            reservation_id: reservation.id,
            user_id: reservation.user_id,
            start_date: reservation.start_date,
            end_date: reservation.end_date,
        };

        let serialized = match SerializedEvent::from_event(&event, None) {
            Ok(serialized) => serialized.with_origin(ORIGIN),
            Err(e) => {
                error!(
                    reservation_id = %reservation.id,
                    error = %e,
                    "failed to serialize ReservationCreated; event not published"
                );
                return;
            },
        };

        match self.bus.publish(RESERVATION_EVENTS_TOPIC, &serialized).await {
            Ok(()) => {
                info!(reservation_id = %reservation.id, "published ReservationCreated");
            },
            Err(e) => {
                error!(
                    reservation_id = %reservation.id,
                    error = %e,
                    "failed to publish ReservationCreated; reservation committed without event"
                );
            },
        }
    }
}

fn to_proto(reservation: &Reservation) -> staykey_proto::v1::Reservation {
    staykey_proto::v1::Reservation {
        id: reservation.id.to_string(),
        user_id: reservation.user_id.to_string(),
        room_id: reservation.room_id,
        start_date: Some(to_timestamp(reservation.start_date)),
        end_date: Some(to_timestamp(reservation.end_date)),
        total_price: reservation.total_price,
        status: staykey_proto::v1::ReservationStatus::from(reservation.status).into(),
    }
}

#[tonic::async_trait]
impl<S: ReservationStore + 'static> ReservationServiceApi for ReservationService<S> {
    async fn create_reservation(
        &self,
        request: Request<CreateReservationRequest>,
    ) -> Result<Response<CreateReservationResponse>, Status> {
        let req = request.into_inner();

        let user_id = parse_uuid(&req.user_id, "user_id")?;
        let start_date = require_datetime(req.start_date.as_ref(), "start_date")?;
        let end_date = require_datetime(req.end_date.as_ref(), "end_date")?;
        if end_date <= start_date {
            return Err(ReservationError::InvalidStayWindow.into());
        }
        if req.room_id <= 0 {
            return Err(ReservationError::MissingField { field: "room_id" }.into());
        }

        let reservation = Reservation {
            id: Uuid::new_v4(),
            user_id,
            room_id: req.room_id,
            start_date,
            end_date,
            total_price: model::price_stay(start_date, end_date),
            status: ReservationStatus::Pending,
            created_at: chrono::Utc::now(),
        };

        self.store.create(&reservation).await?;
        info!(
            reservation_id = %reservation.id,
            user_id = %user_id,
            total_price = reservation.total_price,
            "reservation created"
        );

        // Row first, event second. The publish awaits the channel's own
        // acknowledgment before the response goes out.
        self.publish_created(&reservation).await;

        Ok(Response::new(CreateReservationResponse {
            reservation_id: reservation.id.to_string(),
            status: staykey_proto::v1::ReservationStatus::from(reservation.status).into(),
        }))
    }

    async fn get_reservation(
        &self,
        request: Request<GetReservationRequest>,
    ) -> Result<Response<GetReservationResponse>, Status> {
        let req = request.into_inner();
        let id = parse_uuid(&req.reservation_id, "reservation_id")?;

        let reservation = self
            .store
            .get(id)
            .await?
            .ok_or(ReservationError::NotFound)?;

        Ok(Response::new(GetReservationResponse {
            reservation: Some(to_proto(&reservation)),
        }))
    }

    async fn list_reservations(
        &self,
        request: Request<ListReservationsRequest>,
    ) -> Result<Response<ListReservationsResponse>, Status> {
        let req = request.into_inner();
        let user_id = parse_uuid(&req.user_id, "user_id")?;

        let reservations = self.store.list_for_user(user_id).await?;

        Ok(Response::new(ListReservationsResponse {
            reservations: reservations.iter().map(to_proto).collect(),
        }))
    }
}
