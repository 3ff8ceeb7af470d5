//! Postgres-backed reservation store.

use super::ReservationStore;
use crate::error::{ReservationError, Result};
use crate::model::{Reservation, ReservationStatus};
use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

/// [`ReservationStore`] backed by a Postgres connection pool.
#[derive(Clone)]
pub struct PostgresReservationStore {
    pool: PgPool,
}

impl PostgresReservationStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_err(e: sqlx::Error) -> ReservationError {
    ReservationError::Database(e.to_string())
}

fn row_to_reservation(row: &sqlx::postgres::PgRow) -> Result<Reservation> {
    let status_raw: String = row.try_get("status").map_err(db_err)?;
    let status = ReservationStatus::parse(&status_raw).ok_or_else(|| {
        ReservationError::Database(format!("unknown reservation status {status_raw:?}"))
    })?;

    Ok(Reservation {
        id: row.try_get("id").map_err(db_err)?,
        user_id: row.try_get("user_id").map_err(db_err)?,
        room_id: row.try_get("room_id").map_err(db_err)?,
        start_date: row.try_get("start_date").map_err(db_err)?,
        end_date: row.try_get("end_date").map_err(db_err)?,
        total_price: row.try_get("total_price").map_err(db_err)?,
        status,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

#[async_trait]
impl ReservationStore for PostgresReservationStore {
    async fn create(&self, reservation: &Reservation) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO reservations
                (id, user_id, room_id, start_date, end_date, total_price, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(reservation.id)
        .bind(reservation.user_id)
        .bind(reservation.room_id)
        .bind(reservation.start_date)
        .bind(reservation.end_date)
        .bind(reservation.total_price)
        .bind(reservation.status.as_str())
        .bind(reservation.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| ReservationError::Database(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Reservation>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, room_id, start_date, end_date, total_price, status, created_at
            FROM reservations
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ReservationError::Database(e.to_string()))?;

        row.as_ref().map(row_to_reservation).transpose()
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Reservation>> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, room_id, start_date, end_date, total_price, status, created_at
            FROM reservations
            WHERE user_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ReservationError::Database(e.to_string()))?;

        rows.iter().map(row_to_reservation).collect()
    }
}
