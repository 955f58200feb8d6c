//! Errors raised while driving a connection.
//!
//! Every variant ends the connection it occurred on; sibling connections keep
//! running.

pub type Result<T> = core::result::Result<T, ClientError>;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// The channel could not be established.
    #[error("could not connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: tonic::transport::Error,
    },

    /// The call was rejected or the stream failed while being read.
    #[error("call failed: {0}")]
    Call(#[from] tonic::Status),

    /// The connection task panicked or was cancelled.
    #[error("connection task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
