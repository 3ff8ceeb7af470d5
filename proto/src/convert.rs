//! Conversions between wire types and domain types.
//!
//! The RPC surface carries timestamps as `google.protobuf.Timestamp` and
//! identifiers as strings; the services work in `chrono::DateTime<Utc>` and
//! `uuid::Uuid`. These helpers do the mapping and produce the uniform
//! `InvalidArgument` statuses for malformed request fields.

use chrono::{DateTime, Utc};
use prost_types::Timestamp;
use tonic::Status;
use uuid::Uuid;

/// Convert a `chrono` datetime into a wire timestamp.
#[must_use]
pub fn to_timestamp(dt: DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: dt.timestamp(),
        nanos: i32::try_from(dt.timestamp_subsec_nanos()).unwrap_or(0),
    }
}

/// Convert a wire timestamp into a `chrono` datetime.
///
/// Returns `None` for out-of-range values.
#[must_use]
pub fn to_datetime(ts: &Timestamp) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.seconds, u32::try_from(ts.nanos).ok()?)
}

/// Parse a required UUID request field.
///
/// # Errors
///
/// Returns `InvalidArgument` naming the field if the value is not a UUID.
pub fn parse_uuid(value: &str, field: &str) -> Result<Uuid, Status> {
    Uuid::parse_str(value.trim())
        .map_err(|_| Status::invalid_argument(format!("invalid {field}: expected a UUID")))
}

/// Extract a required timestamp request field.
///
/// # Errors
///
/// Returns `InvalidArgument` naming the field if the timestamp is missing
/// or out of range.
pub fn require_datetime(ts: Option<&Timestamp>, field: &str) -> Result<DateTime<Utc>, Status> {
    ts.and_then(to_datetime)
        .ok_or_else(|| Status::invalid_argument(format!("invalid {field}: expected a timestamp")))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

    use super::*;

    #[test]
    fn timestamp_roundtrip() {
        let dt: DateTime<Utc> = "2025-06-01T15:00:00Z".parse().expect("valid timestamp");
        let ts = to_timestamp(dt);
        assert_eq!(to_datetime(&ts), Some(dt));
    }

    #[test]
    fn parse_uuid_accepts_surrounding_whitespace() {
        let id = Uuid::new_v4();
        let parsed = parse_uuid(&format!("  {id} "), "user_id");
        assert_eq!(parsed.ok(), Some(id));
    }

    #[test]
    fn parse_uuid_rejects_garbage() {
        let err = parse_uuid("not-a-uuid", "user_id").unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
        assert!(err.message().contains("user_id"));
    }

    #[test]
    fn require_datetime_rejects_missing_field() {
        let err = require_datetime(None, "start_date").unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
        assert!(err.message().contains("start_date"));
    }
}
