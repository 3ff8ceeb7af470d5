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

/// Runtime configuration for the token authority.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string.
    pub database_url: String,
    /// HMAC secret for token signing. Required, no default: a guessable
    /// fallback secret would let anyone mint tokens.
    pub jwt_secret: String,
    /// gRPC listen address.
    pub listen_addr: SocketAddr,
    /// Token lifetime in seconds.
    pub token_ttl_secs: i64,
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
        let jwt_secret =
            std::env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        let listen_addr = std::env::var("AUTH_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:50051".to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "AUTH_LISTEN_ADDR",
                reason: e.to_string(),
            })?;

        let token_ttl_secs = match std::env::var("TOKEN_TTL_SECS") {
            Ok(raw) => raw.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid {
                    name: "TOKEN_TTL_SECS",
                    reason: e.to_string(),
                }
            })?,
            Err(_) => 3600,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            listen_addr,
            token_ttl_secs,
        })
    }
}
