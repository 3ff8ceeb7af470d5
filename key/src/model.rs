//! Access key domain model and door code generation.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::rngs::OsRng;
use uuid::Uuid;

/// A provisioned door access code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessKey {
    /// Key id.
    pub id: Uuid,
    /// The reservation this key belongs to. One key per reservation.
    pub reservation_id: Uuid,
    /// The guest who can use the key.
    pub user_id: Uuid,
    /// The door code, a 4-digit PIN.
    pub key_code: String,
    /// The smart lock the code is programmed into.
    pub device_id: String,
    /// Start of the validity window.
    pub valid_from: DateTime<Utc>,
    /// End of the validity window. Revocation moves this to now.
    pub valid_until: DateTime<Utc>,
    /// Record creation time.
    pub created_at: DateTime<Utc>,
}

impl AccessKey {
    /// Whether the key opens the door at `at`.
    #[must_use]
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && at < self.valid_until
    }
}

/// Generate a door code: a 4-digit PIN from the OS random source.
#[must_use]
pub fn generate_key_code() -> String {
    OsRng.gen_range(1000..=9999).to_string()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

    use super::*;

    #[test]
    fn key_codes_are_four_digit_pins() {
        for _ in 0..200 {
            let code = generate_key_code();
            assert_eq!(code.len(), 4);
            let value: u32 = code.parse().unwrap();
            assert!((1000..=9999).contains(&value));
        }
    }

    #[test]
    fn validity_window_is_inclusive_exclusive() {
        let valid_from: DateTime<Utc> = "2025-06-01T15:00:00Z".parse().unwrap();
        let valid_until: DateTime<Utc> = "2025-06-03T11:00:00Z".parse().unwrap();
        let key = AccessKey {
            id: Uuid::new_v4(),
            reservation_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            key_code: "1234".to_string(),
            device_id: "smart-lock-device-001".to_string(),
            valid_from,
            valid_until,
            created_at: valid_from,
        };

        assert!(key.is_valid_at(valid_from));
        assert!(key.is_valid_at("2025-06-02T00:00:00Z".parse().unwrap()));
        assert!(!key.is_valid_at(valid_until));
        assert!(!key.is_valid_at("2025-05-31T00:00:00Z".parse().unwrap()));
    }
}
