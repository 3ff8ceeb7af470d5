//! Protobuf types and gRPC service definitions for StayKey.
//!
//! This crate provides:
//! - Generated message types and tonic service traits ([`v1`])
//! - Conversions between wire timestamps and `chrono` ([`convert`])
//!
//! Keeping the wire format in its own crate lets callers that only need the
//! RPC contract (the edge gateway, test clients) avoid pulling in any
//! service internals.

#![forbid(unsafe_code)]
// gRPC handlers return tonic::Status by value - standard tonic practice
#![allow(clippy::result_large_err)]

/// Generated protobuf types and service traits.
pub mod v1 {
    #![allow(clippy::all, clippy::pedantic)]
    #![allow(missing_docs)]

    tonic::include_proto!("staykey.v1");
}

pub mod convert;
