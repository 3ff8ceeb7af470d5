//! Reservation domain model and pricing.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Flat nightly rate, in minor currency units.
pub const NIGHTLY_RATE: i64 = 50_000;

/// Lifecycle status of a reservation.
///
/// New reservations start `Pending`; the rest of the lifecycle is driven
/// by later operational flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationStatus {
    /// Created, awaiting confirmation.
    Pending,
    /// Confirmed by the property.
    Confirmed,
    /// Cancelled before the stay.
    Cancelled,
    /// The stay has ended.
    Completed,
}

impl ReservationStatus {
    /// Database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
            Self::Completed => "COMPLETED",
        }
    }

    /// Parse the database representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(Self::Pending),
            "CONFIRMED" => Some(Self::Confirmed),
            "CANCELLED" => Some(Self::Cancelled),
            "COMPLETED" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl From<ReservationStatus> for staykey_proto::v1::ReservationStatus {
    fn from(status: ReservationStatus) -> Self {
        match status {
            ReservationStatus::Pending => Self::Pending,
            ReservationStatus::Confirmed => Self::Confirmed,
            ReservationStatus::Cancelled => Self::Cancelled,
            ReservationStatus::Completed => Self::Completed,
        }
    }
}

/// A stored reservation.
#[derive(Debug, Clone)]
pub struct Reservation {
    /// Reservation id.
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// Booked room.
    pub room_id: i32,
    /// Check-in.
    pub start_date: DateTime<Utc>,
    /// Check-out.
    pub end_date: DateTime<Utc>,
    /// Total price in minor currency units.
    pub total_price: i64,
    /// Lifecycle status.
    pub status: ReservationStatus,
    /// Record creation time.
    pub created_at: DateTime<Utc>,
}

/// Price a stay at the flat nightly rate.
///
/// Nights are whole days between check-in and check-out; any stay shorter
/// than a full day is billed as one night.
#[must_use]
pub fn price_stay(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let nights = (end - start).num_days().max(1);
    nights * NIGHTLY_RATE
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

    use super::*;

    fn date(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn two_night_stay_costs_two_nightly_rates() {
        let price = price_stay(date("2025-06-01T15:00:00Z"), date("2025-06-03T15:00:00Z"));
        assert_eq!(price, 100_000);
    }

    #[test]
    fn sub_day_stay_bills_one_night() {
        let price = price_stay(date("2025-06-01T15:00:00Z"), date("2025-06-01T20:00:00Z"));
        assert_eq!(price, NIGHTLY_RATE);
    }

    #[test]
    fn partial_final_day_is_not_billed() {
        // 1.5 days rounds down to one full night.
        let price = price_stay(date("2025-06-01T12:00:00Z"), date("2025-06-03T00:00:00Z"));
        assert_eq!(price, NIGHTLY_RATE);
    }

    proptest::proptest! {
        #[test]
        fn whole_night_stays_price_linearly(nights in 1i64..=365) {
            let start = date("2025-01-01T15:00:00Z");
            let end = start + chrono::Duration::days(nights);
            proptest::prop_assert_eq!(price_stay(start, end), nights * NIGHTLY_RATE);
        }

        #[test]
        fn every_stay_is_billed_at_least_one_night(minutes in 1i64..=1440) {
            let start = date("2025-01-01T15:00:00Z");
            let end = start + chrono::Duration::minutes(minutes);
            proptest::prop_assert_eq!(price_stay(start, end), NIGHTLY_RATE);
        }
    }

    #[test]
    fn status_roundtrips_through_storage_form() {
        for status in [
            ReservationStatus::Pending,
            ReservationStatus::Confirmed,
            ReservationStatus::Cancelled,
            ReservationStatus::Completed,
        ] {
            assert_eq!(ReservationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ReservationStatus::parse("UNKNOWN"), None);
    }
}
