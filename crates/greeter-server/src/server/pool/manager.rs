//! Asynchronous worker pool for streaming greetings.
//!
//! This module defines the [`WorkerPool`] struct, which manages a fixed set of
//! worker tasks responsible for processing [`WorkRequest`]s. It tracks how many
//! streams are in flight and supports coordinated shutdown via a shared
//! [`CancellationToken`].
//!
//! All workers pull from one bounded [`WorkQueue`] and execute one stream at a
//! time, so a request is always picked up by whichever worker frees up first.
//! A stalled stream holds only its own worker. When the queue is full the
//! caller waits.

use crate::server::{
    streaming::request::WorkRequest,
    telemetry::{decrement_streams_inflight, increment_streams_inflight, record_stream_duration},
};
use core::time::Duration;
use greeter_core::Error;
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};
use std::{sync::Arc, time::Instant};
use tokio::{
    sync::{Mutex, mpsc, oneshot},
    time::{sleep, timeout},
};
use tokio_util::sync::CancellationToken;

/// Receiving end of the pool's work queue, shared by every worker.
///
/// Only an idle worker waits on the lock, so the next request goes to it.
pub type WorkQueue = Arc<Mutex<mpsc::Receiver<WorkRequest>>>;

/// Creates the pool's work queue, holding up to `capacity` pending requests.
pub fn work_queue(capacity: usize) -> (mpsc::Sender<WorkRequest>, WorkQueue) {
    let (tx, rx) = mpsc::channel(capacity);
    (tx, Arc::new(Mutex::new(rx)))
}

/// Shared admission state: whether new streams are accepted and how many are
/// currently being served.
#[derive(Debug)]
pub struct StreamTracker {
    accepting: AtomicBool,
    inflight: AtomicUsize,
}

impl StreamTracker {
    pub const fn new() -> Self {
        Self {
            accepting: AtomicBool::new(true),
            inflight: AtomicUsize::new(0),
        }
    }

    pub fn streams_inflight(&self) -> usize {
        self.inflight.load(Ordering::Acquire)
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    fn stop_accepting(&self) {
        self.accepting.store(false, Ordering::Release);
    }
}

impl Default for StreamTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts a stream as in flight for as long as it is alive.
///
/// Dropping the guard releases the slot and records the stream duration.
#[derive(Debug)]
pub struct StreamGuard {
    tracker: Arc<StreamTracker>,
    started: Instant,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.tracker.inflight.fetch_sub(1, Ordering::AcqRel);
        decrement_streams_inflight();
        record_stream_duration(self.started.elapsed().as_secs_f64() * 1000.0);
    }
}

/// A cooperative pool of asynchronous workers that process [`WorkRequest`]s.
///
/// Requests go through a single bounded queue that every worker pulls from.
/// The pool supports graceful, cancellable shutdown.
pub struct WorkerPool {
    queue: mpsc::Sender<WorkRequest>,
    num_workers: usize,
    tracker: Arc<StreamTracker>,
    shutdown_token: CancellationToken,
    shutdown_timeout: u64,
}

impl WorkerPool {
    /// Constructs a new [`WorkerPool`] from the sending half of the work queue
    /// served by `num_workers` workers and a shared cancellation token.
    pub fn new(
        queue: mpsc::Sender<WorkRequest>,
        num_workers: usize,
        shutdown_token: CancellationToken,
        shutdown_timeout: u64,
    ) -> Self {
        Self {
            queue,
            num_workers,
            tracker: Arc::new(StreamTracker::new()),
            shutdown_token,
            shutdown_timeout,
        }
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn streams_inflight(&self) -> usize {
        self.tracker.streams_inflight()
    }

    /// Admits a new stream, counting it as in flight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceShutdown`] once shutdown has started.
    pub fn begin_stream(&self) -> Result<StreamGuard, Error> {
        if !self.tracker.is_accepting() || self.shutdown_token.is_cancelled() {
            return Err(Error::ServiceShutdown);
        }

        self.tracker.inflight.fetch_add(1, Ordering::AcqRel);
        increment_streams_inflight();

        Ok(StreamGuard {
            tracker: Arc::clone(&self.tracker),
            started: Instant::now(),
        })
    }

    /// Queues a [`WorkRequest`] for the first idle worker.
    ///
    /// Waits while the queue is full. A request still waiting when shutdown
    /// cancels the pool is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The service is shutting down (`shutdown_token` was cancelled).
    /// - The work queue is closed.
    pub async fn dispatch(&self, request: WorkRequest) -> Result<(), Error> {
        tokio::select! {
            biased;
            () = self.shutdown_token.cancelled() => Err(Error::ServiceShutdown),
            sent = self.queue.send(request) => sent.map_err(|_| Error::ChannelError {
                context: "Work queue closed".to_string(),
            }),
        }
    }

    /// Gracefully shuts down all workers in the pool.
    ///
    /// - Refuses new streams.
    /// - Waits up to `shutdown_timeout` seconds for in-flight streams to drain.
    /// - Cancels the shared [`CancellationToken`] so remaining streams stop.
    /// - Queues one [`WorkRequest::Shutdown`] per worker and waits (up to 3
    ///   seconds per worker) for the acknowledgements. Each send is bounded by
    ///   the same 3 seconds, so a wedged worker cannot stall shutdown.
    pub async fn shutdown(&self) -> Result<(), Error> {
        // === Phase 0: Stop accepting new requests ===
        tracing::info!("Refusing new requests");
        self.tracker.stop_accepting();

        // === Phase 1: Wait for in-flight streams to drain ===
        tracing::info!(
            "Draining in-flight streams ({} active)",
            self.streams_inflight()
        );
        let drain_result = timeout(Duration::from_secs(self.shutdown_timeout), async {
            while self.streams_inflight() > 0 {
                sleep(Duration::from_millis(100)).await;
            }
        })
        .await;

        match drain_result {
            Ok(()) => {
                tracing::debug!("All in-flight streams drained successfully");
            }
            Err(_) => {
                tracing::warn!(
                    "Graceful drain timed out ({} streams still active)",
                    self.streams_inflight()
                );
            }
        }

        // === Phase 2: Cancel any remaining work ===
        tracing::debug!("Cancelling remaining work via shutdown token");
        self.shutdown_token.cancel();

        // === Phase 3: Notify workers to shut down ===
        tracing::debug!("Notifying all workers to shut down");
        let mut shutdown_handles = Vec::with_capacity(self.num_workers);

        for i in 0..self.num_workers {
            let (tx, rx) = oneshot::channel();
            let request = WorkRequest::Shutdown { response: tx };
            match timeout(Duration::from_secs(3), self.queue.send(request)).await {
                Ok(Ok(())) => shutdown_handles.push((i, rx)),
                Ok(Err(e)) => {
                    tracing::error!("Failed to queue shutdown {i}: {e}");
                    break;
                }
                Err(_) => {
                    tracing::warn!("Timed out queueing shutdown {i}");
                    break;
                }
            }
        }

        tracing::debug!("Waiting for up to 3s per worker for shutdown acknowledgements");

        let timeout_futures = shutdown_handles.into_iter().map(|(i, rx)| async move {
            match timeout(Duration::from_secs(3), rx).await {
                Ok(Ok(())) => {
                    tracing::trace!("Shutdown {i} acknowledged");
                }
                Ok(Err(e)) => {
                    tracing::error!("Shutdown {i} was not acknowledged: {e}");
                }
                Err(_) => {
                    tracing::warn!("Shutdown {i} timed out");
                }
            }
        });

        futures::future::join_all(timeout_futures).await;

        tracing::info!("Worker pool shutdown complete");

        Ok(())
    }
}
