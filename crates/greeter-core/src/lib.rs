//! # `greeter-core`
//!
//! Shared pieces of the greeter service: the generated gRPC bindings, the
//! embedded greeting table and the error type surfaced to clients as
//! [`tonic::Status`].
//!
//! Both `greeter-server` and `greeter-client` depend on this crate so that
//! they agree on the wire contract at compile time.

mod common;
pub use common::*;

/// gRPC service and message definitions generated from
/// `proto/helloworld.proto`.
///
/// ## Service
///
/// - `SayHello` - Unary greeting, `"Hello <name>"`.
/// - `LotsOfReplies` - Server stream with one reply per greeting table entry.
pub mod proto {
    tonic::include_proto!("helloworld");

    /// Encoded file descriptor set used to register server reflection.
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("helloworld_descriptor");
}
