use greeter_core::{Error, GreetingTable, proto::HelloReply};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::Status;

/// Streams every greeting in `table` for `name` within a worker.
///
/// Replies are sent in table order through `reply_tx`, which feeds the
/// client's gRPC response stream. Returns the number of replies delivered.
///
/// # Errors
///
/// - [`Error::StreamClosed`] if the receiver went away mid-stream. Nothing is
///   retried; the remaining entries are skipped.
/// - [`Error::ServiceShutdown`] if `shutdown` fired before the last entry,
///   including while waiting on a full `reply_tx`. An `unavailable` status is
///   forwarded to the client if the channel has room for it.
pub async fn handle_stream_request(
    worker_id: usize,
    table: &GreetingTable,
    name: &str,
    reply_tx: &mpsc::Sender<Result<HelloReply, Status>>,
    shutdown: &CancellationToken,
) -> greeter_core::Result<usize> {
    let mut delivered = 0;

    for entry in table {
        let reply = HelloReply {
            message: entry.greet(name),
        };

        // A slow reader parks the worker here, so shutdown must win the race.
        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                tracing::debug!("Worker {worker_id} cancelling stream after {delivered} replies");
                if let Err(e) = reply_tx.try_send(Err(Error::ServiceShutdown.into())) {
                    tracing::debug!("Worker {worker_id} failed to forward shutdown: {e}");
                }
                return Err(Error::ServiceShutdown);
            }
            sent = reply_tx.send(Ok(reply)) => {
                if sent.is_err() {
                    return Err(Error::StreamClosed { delivered });
                }
            }
        }

        delivered += 1;
    }

    Ok(delivered)
}
