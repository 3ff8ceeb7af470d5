//! Reservation ledger for the StayKey platform.
//!
//! Owns booking records: creates reservations in PENDING state, prices the
//! stay at a flat nightly rate, and publishes a `ReservationCreated` event
//! to the event channel after the row is committed. Exposed over gRPC as
//! `staykey.v1.ReservationService`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod model;
pub mod service;
pub mod stores;
