//! Environment-driven configuration.

use std::net::SocketAddr;
use thiserror::Error;

/// Configuration loading failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// An environment variable has an unparseable value.
    #[error("invalid value for {name}: {reason}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// What was wrong with it
        reason: String,
    },
}

/// Runtime configuration for the key provisioner.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string.
    pub database_url: String,
    /// Kafka-protocol broker addresses, comma-separated.
    pub brokers: String,
    /// Consumer group for the reservation event subscription. Instances
    /// sharing this group split the stream (competing consumers).
    pub consumer_group: String,
    /// The smart lock device codes are programmed into.
    pub device_id: String,
    /// Reservation ledger gRPC endpoint.
    pub reservation_url: String,
    /// gRPC listen address.
    pub listen_addr: SocketAddr,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let brokers =
            std::env::var("REDPANDA_BROKERS").unwrap_or_else(|_| "localhost:9092".to_string());

        let consumer_group =
            std::env::var("KEY_CONSUMER_GROUP").unwrap_or_else(|_| "key-service".to_string());

        let device_id = std::env::var("SMART_LOCK_DEVICE_ID")
            .unwrap_or_else(|_| "smart-lock-device-001".to_string());

        let reservation_url = std::env::var("RESERVATION_SERVICE_URL")
            .unwrap_or_else(|_| "http://localhost:50052".to_string());

        let listen_addr = std::env::var("KEY_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:50053".to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "KEY_LISTEN_ADDR",
                reason: e.to_string(),
            })?;

        Ok(Self {
            database_url,
            brokers,
            consumer_group,
            device_id,
            reservation_url,
            listen_addr,
        })
    }
}
