//! Key provisioner for the StayKey platform.
//!
//! Listens for `ReservationCreated` events and provisions a door access
//! code for each reservation's stay window. Provisioning is idempotent
//! (one key per reservation, enforced in storage), which makes the
//! at-least-once event channel safe to consume. Also exposed over gRPC as
//! `staykey.v1.KeyService` for revocation and listing.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod consumer;
pub mod error;
pub mod model;
pub mod reservation_lookup;
pub mod service;
pub mod stores;
