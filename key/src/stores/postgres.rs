//! Postgres-backed key store.

use super::{KeyStore, NewAccessKey};
use crate::error::{KeyError, Result};
use crate::model::AccessKey;
use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

const KEY_COLUMNS: &str =
    "id, reservation_id, user_id, key_code, device_id, valid_from, valid_until, created_at";

/// [`KeyStore`] backed by a Postgres connection pool.
///
/// One-key-per-reservation is the `UNIQUE (reservation_id)` constraint;
/// concurrent inserts resolve through `ON CONFLICT DO NOTHING` plus a
/// follow-up read of the winning row.
#[derive(Clone)]
pub struct PostgresKeyStore {
    pool: PgPool,
}

impl PostgresKeyStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by_reservation(&self, reservation_id: Uuid) -> Result<Option<AccessKey>> {
        let row = sqlx::query(&format!(
            "SELECT {KEY_COLUMNS} FROM access_keys WHERE reservation_id = $1"
        ))
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| KeyError::Database(e.to_string()))?;

        row.as_ref().map(row_to_key).transpose()
    }
}

fn db_err(e: sqlx::Error) -> KeyError {
    KeyError::Database(e.to_string())
}

fn row_to_key(row: &sqlx::postgres::PgRow) -> Result<AccessKey> {
    Ok(AccessKey {
        id: row.try_get("id").map_err(db_err)?,
        reservation_id: row.try_get("reservation_id").map_err(db_err)?,
        user_id: row.try_get("user_id").map_err(db_err)?,
        key_code: row.try_get("key_code").map_err(db_err)?,
        device_id: row.try_get("device_id").map_err(db_err)?,
        valid_from: row.try_get("valid_from").map_err(db_err)?,
        valid_until: row.try_get("valid_until").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

#[async_trait]
impl KeyStore for PostgresKeyStore {
    async fn create_or_existing(&self, key: NewAccessKey) -> Result<(AccessKey, bool)> {
        let row = sqlx::query(&format!(
            r"
            INSERT INTO access_keys
                (id, reservation_id, user_id, key_code, device_id, valid_from, valid_until)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (reservation_id) DO NOTHING
            RETURNING {KEY_COLUMNS}
            "
        ))
        .bind(Uuid::new_v4())
        .bind(key.reservation_id)
        .bind(key.user_id)
        .bind(&key.key_code)
        .bind(&key.device_id)
        .bind(key.valid_from)
        .bind(key.valid_until)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| KeyError::Database(e.to_string()))?;

        if let Some(row) = row {
            return Ok((row_to_key(&row)?, true));
        }

        // Lost the insert race (or a duplicate delivery): the reservation
        // already has a key; hand that one back.
        self.find_by_reservation(key.reservation_id)
            .await?
            .map(|existing| (existing, false))
            .ok_or_else(|| {
                KeyError::Database(format!(
                    "key for reservation {} vanished between insert and read",
                    key.reservation_id
                ))
            })
    }

    async fn revoke(&self, reservation_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE access_keys
            SET valid_until = now()
            WHERE reservation_id = $1 AND valid_until > now()
            ",
        )
        .bind(reservation_id)
        .execute(&self.pool)
        .await
        .map_err(|e| KeyError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_valid_for_user(&self, user_id: Uuid) -> Result<Vec<AccessKey>> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {KEY_COLUMNS}
            FROM access_keys
            WHERE user_id = $1 AND valid_until > now()
            ORDER BY valid_from
            "
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| KeyError::Database(e.to_string()))?;

        rows.iter().map(row_to_key).collect()
    }
}
