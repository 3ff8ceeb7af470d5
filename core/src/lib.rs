//! Shared contracts for the StayKey platform.
//!
//! This crate defines what the reservation saga's services agree on without
//! sharing any process state:
//!
//! - [`event::Event`] and [`event::SerializedEvent`] — the byte-level shape of
//!   messages crossing the event channel
//! - [`event_bus::EventBus`] — publish/subscribe with explicit per-message
//!   acknowledgment (at-least-once delivery)
//! - [`reservation::ReservationEvent`] — the domain events emitted by the
//!   reservation ledger and consumed by the key provisioner
//!
//! Services communicate only through RPC calls and this event channel; there
//! is no cross-service transaction. Consumers must therefore be idempotent —
//! the channel may redeliver any message.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod event;
pub mod event_bus;
pub mod reservation;
