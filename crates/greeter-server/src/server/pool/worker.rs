use crate::server::{
    pool::manager::WorkQueue,
    streaming::{processor::handle_stream_request, request::WorkRequest},
    telemetry::{increment_replies_sent, increment_stream_errors},
};
use greeter_core::{Error, GreetingTable};
use tokio_util::sync::CancellationToken;

/// Worker task responsible for processing [`WorkRequest`] messages.
///
/// Each worker holds a handle to the shared, read-only [`GreetingTable`] and
/// serves one stream at a time until a shutdown request arrives or every
/// sender is dropped.
///
/// # Arguments
///
/// - `worker_id`: Numeric identifier for this worker (used for logs).
/// - `queue`: Work queue shared with the other workers. The lock is held only
///   while waiting for the next request, never while serving it.
/// - `table`: Greetings streamed back for every request.
/// - `shutdown`: Token cancelled by the pool once draining has timed out.
///
/// # Request Types
///
/// - [`WorkRequest::Stream`] - Streams the table via
///   [`handle_stream_request`]. A failed stream only ends that stream.
/// - [`WorkRequest::Shutdown`] - Signals the worker to stop and acknowledge
///   shutdown.
pub async fn worker_loop(
    worker_id: usize,
    queue: WorkQueue,
    table: GreetingTable,
    shutdown: CancellationToken,
) {
    tracing::trace!("Worker {worker_id} started");

    loop {
        let next = queue.lock().await.recv().await;
        let Some(work) = next else {
            break;
        };

        match work {
            WorkRequest::Stream {
                name,
                reply_tx,
                guard,
            } => {
                let result =
                    handle_stream_request(worker_id, &table, &name, &reply_tx, &shutdown).await;

                match result {
                    Ok(delivered) => {
                        increment_replies_sent(delivered as u64);
                        tracing::debug!("Worker {worker_id} streamed {delivered} replies to {name}");
                    }
                    Err(Error::StreamClosed { delivered }) => {
                        increment_replies_sent(delivered as u64);
                        increment_stream_errors();
                        tracing::warn!(
                            "Worker {worker_id}: stream for {name} closed after {delivered} replies"
                        );
                    }
                    Err(e) => {
                        increment_stream_errors();
                        tracing::warn!("Worker {worker_id}: stream for {name} failed: {e}");
                    }
                }

                drop(guard);
            }
            WorkRequest::Shutdown { response } => {
                tracing::debug!("Worker {worker_id} received shutdown signal");

                if response.send(()).is_err() {
                    tracing::error!("Worker {worker_id} failed to acknowledge shutdown");
                }
                break;
            }
        }
    }

    tracing::trace!("Worker {worker_id} stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::pool::manager::{WorkerPool, work_queue};
    use core::time::Duration;
    use greeter_core::{GreetingEntry, proto::HelloReply};
    use std::sync::Arc;
    use tokio::{sync::mpsc, task::JoinHandle, time::timeout};
    use tonic::Status;

    type Replies = mpsc::Receiver<Result<HelloReply, Status>>;

    fn table() -> GreetingTable {
        GreetingTable::new(vec![
            GreetingEntry::new("English", "Hello"),
            GreetingEntry::new("French", "Bonjour"),
        ])
    }

    fn spawn_pool(num_workers: usize) -> (WorkerPool, Vec<JoinHandle<()>>) {
        let token = CancellationToken::new();
        let (tx, queue) = work_queue(num_workers);
        let handles = (0..num_workers)
            .map(|id| {
                tokio::spawn(worker_loop(
                    id,
                    Arc::clone(&queue),
                    table(),
                    token.clone(),
                ))
            })
            .collect();
        (WorkerPool::new(tx, num_workers, token, 0), handles)
    }

    async fn stream(pool: &WorkerPool, name: &str, buffer: usize) -> Replies {
        let (reply_tx, reply_rx) = mpsc::channel(buffer);
        pool.dispatch(WorkRequest::Stream {
            name: name.to_string(),
            reply_tx,
            guard: pool.begin_stream().unwrap(),
        })
        .await
        .unwrap();
        reply_rx
    }

    async fn collect(mut reply_rx: Replies) -> Vec<String> {
        let mut messages = Vec::new();
        while let Some(reply) = reply_rx.recv().await {
            messages.push(reply.unwrap().message);
        }
        messages
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn serves_requests_until_shutdown() {
        let (pool, handles) = spawn_pool(1);

        for i in 0..3 {
            let name = format!("world-{i}");
            let messages = collect(stream(&pool, &name, 8).await).await;
            assert_eq!(
                messages,
                [format!("[English] Hello {name}"), format!("[French] Bonjour {name}")]
            );
        }

        pool.shutdown().await.unwrap();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(pool.streams_inflight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stalled_stream_holds_only_its_own_worker() {
        let (pool, handles) = spawn_pool(2);

        // Never read: the worker serving it blocks on the second reply.
        let _stalled = stream(&pool, "stalled", 1).await;

        for i in 0..4 {
            let name = format!("world-{i}");
            let messages = timeout(Duration::from_secs(5), async {
                collect(stream(&pool, &name, 8).await).await
            })
            .await
            .expect("request waited behind a stalled stream");
            assert_eq!(messages.len(), 2);
        }

        timeout(Duration::from_secs(10), pool.shutdown())
            .await
            .expect("shutdown hung on a stalled stream")
            .unwrap();
        for handle in handles {
            timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
        }
        assert_eq!(pool.streams_inflight(), 0);
    }
}
