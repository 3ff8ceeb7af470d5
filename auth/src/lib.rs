//! Token authority for the StayKey platform.
//!
//! Owns user accounts and bearer tokens. Registration hashes passwords
//! with argon2id, login exchanges credentials for a time-boxed HS256 JWT,
//! and validation is a soft check other services call before acting on a
//! request. Exposed over gRPC as `staykey.v1.AuthService`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod password;
pub mod service;
pub mod stores;
pub mod token;
