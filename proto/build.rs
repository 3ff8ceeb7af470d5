//! Build script for staykey-proto.
//!
//! Compiles the protobuf definitions into Rust service traits and message
//! types with tonic-build. Both servers and clients are generated: the
//! servers back the three services, the clients are the contract consumed
//! by the edge gateway and by integration tooling.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/staykey/v1/staykey.proto");

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/staykey/v1/staykey.proto"], &["proto"])?;

    Ok(())
}
