//! Testing utilities for the StayKey platform.
//!
//! Provides an in-memory [`EventBus`] implementation with the same
//! acknowledgment contract as the production channel: at-least-once,
//! nack means redelivery. Service crates combine it with their own
//! in-memory stores to exercise the full saga without a broker.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod event_bus;

pub use event_bus::InMemoryEventBus;
