use crate::server::pool::manager::StreamGuard;
use greeter_core::proto::HelloReply;
use tokio::sync::{mpsc, oneshot};
use tonic::Status;

/// A message sent from the worker pool to an individual worker task.
///
/// [`WorkRequest`]s travel over bounded channels and are consumed by the
/// worker's main loop, one at a time.
#[derive(Debug)]
pub enum WorkRequest {
    /// Stream one greeting per table entry to `reply_tx`.
    ///
    /// - `name`: Name appended to every greeting.
    /// - `reply_tx`: Output channel feeding the client's gRPC stream.
    /// - `guard`: Keeps the stream counted as in flight until the worker is
    ///   done with it.
    Stream {
        name: String,
        reply_tx: mpsc::Sender<Result<HelloReply, Status>>,
        guard: StreamGuard,
    },

    /// Request the worker to shut down gracefully.
    ///
    /// - `response`: One-shot channel for acknowledging that the worker has
    ///   completed its shutdown routine.
    Shutdown { response: oneshot::Sender<()> },
}
