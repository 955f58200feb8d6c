//! Error types for the greeter service.
//!
//! This module defines the central `Error` enum, which captures every
//! reportable failure on the server side of the greeter. It implements
//! `From<Error>` for `tonic::Status` so handlers can propagate errors with `?`
//! and clients receive an appropriate status code.
//!
//! ## Error Cases
//! - `GreetingTable`: The embedded greeting table could not be loaded.
//! - `ChannelError`: An internal communication failure between the service
//!   and its workers.
//! - `StreamClosed`: The receiving side of a reply stream went away before
//!   every greeting was delivered.
//! - `ServiceShutdown`: A request arrived while the service was shutting down.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the greeter service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The greeting table is malformed or empty.
    #[error("Greeting table error: {reason}")]
    GreetingTable { reason: String },

    /// Internal channel send/receive failure (e.g., closed worker queue).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// The reply stream was dropped by its receiver.
    #[error("Reply stream closed after {delivered} greetings")]
    StreamClosed { delivered: usize },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::GreetingTable { reason } => {
                Status::internal(format!("Greeting table error: {}", reason))
            }
            Error::ChannelError { context } => {
                Status::internal(format!("Channel error: {}", context))
            }
            Error::StreamClosed { .. } => Status::cancelled("Reply stream was closed"),
            Error::ServiceShutdown => Status::unavailable("Service is shutting down"),
        }
    }
}
