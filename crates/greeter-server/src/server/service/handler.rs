//! gRPC service implementation for the greeter.
//!
//! This module defines [`GreeterService`], the concrete implementation of the
//! `Greeter` gRPC service defined in `helloworld.proto`.
//!
//! ## Responsibilities
//!
//! - Answer `SayHello` inline with a single formatted greeting.
//! - Spawn and own the background worker pool that serves `LotsOfReplies`.
//! - Admit streams, hand them to a worker and return the reply stream.
//! - Refuse new streams and drain existing ones on shutdown.

use crate::server::{
    config::ServerConfig,
    pool::{
        manager::{WorkerPool, work_queue},
        worker::worker_loop,
    },
    streaming::request::WorkRequest,
    telemetry::{increment_requests, increment_stream_errors},
};
use core::pin::Pin;
use greeter_core::{
    Error, GreetingTable, format_hello,
    proto::{HelloReply, HelloRequest, greeter_server::Greeter},
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::{Stream, wrappers::ReceiverStream};
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};

/// gRPC service streaming localized greetings.
///
/// Unary calls are answered directly. Every streaming call is picked up by
/// the first idle worker of a fixed-size pool, which walks the greeting table
/// and feeds the replies into a bounded channel backing the response stream.
#[derive(Clone)]
pub struct GreeterService {
    config: ServerConfig,
    worker_pool: Arc<WorkerPool>,
}

impl GreeterService {
    /// Creates a new `GreeterService` and spawns `config.num_workers` worker
    /// tasks sharing `table`.
    ///
    /// Workers share one queue holding up to `num_workers` pending streams;
    /// further callers block in [`WorkerPool::dispatch`].
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: ServerConfig, table: GreetingTable) -> Self {
        let shutdown_token = CancellationToken::new();
        let (tx, queue) = work_queue(config.num_workers);

        for worker_id in 0..config.num_workers {
            tokio::spawn(worker_loop(
                worker_id,
                Arc::clone(&queue),
                table.clone(),
                shutdown_token.clone(),
            ));
        }

        let worker_pool = WorkerPool::new(
            tx,
            config.num_workers,
            shutdown_token,
            config.shutdown_timeout,
        );

        Self {
            config,
            worker_pool: Arc::new(worker_pool),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Number of streams currently admitted and not yet finished.
    pub fn streams_inflight(&self) -> usize {
        self.worker_pool.streams_inflight()
    }

    /// Initiates a graceful shutdown of the worker pool.
    ///
    /// New streams are refused immediately; in-flight streams get
    /// `shutdown_timeout` seconds to finish before they are cancelled.
    pub async fn shutdown(&self) -> Result<(), Error> {
        self.worker_pool.shutdown().await
    }
}

#[tonic::async_trait]
impl Greeter for GreeterService {
    type LotsOfRepliesStream = Pin<Box<dyn Stream<Item = Result<HelloReply, Status>> + Send>>;

    async fn say_hello(
        &self,
        req: Request<HelloRequest>,
    ) -> Result<Response<HelloReply>, Status> {
        increment_requests();
        let name = req.into_inner().name;
        tracing::info!("Received: {name}");

        Ok(Response::new(HelloReply {
            message: format_hello(&name),
        }))
    }

    /// Streams one reply per greeting table entry, in table order.
    ///
    /// The handler only admits the stream and queues it for the pool; replies
    /// are produced by the worker while the transport drains the channel. A
    /// client that disconnects mid-stream ends that stream only.
    #[tracing::instrument(skip_all, fields(name = %req.get_ref().name))]
    async fn lots_of_replies(
        &self,
        req: Request<HelloRequest>,
    ) -> Result<Response<Self::LotsOfRepliesStream>, Status> {
        increment_requests();

        let guard = self
            .worker_pool
            .begin_stream()
            .inspect_err(|_| increment_stream_errors())?;

        let name = req.into_inner().name;
        let (reply_tx, reply_rx) =
            mpsc::channel::<Result<HelloReply, Status>>(self.config.stream_buffer_size);

        self.worker_pool
            .dispatch(WorkRequest::Stream {
                name,
                reply_tx,
                guard,
            })
            .await
            .inspect_err(|e| {
                increment_stream_errors();
                tracing::warn!("Failed to dispatch stream: {e}");
            })?;

        Ok(Response::new(Box::pin(ReceiverStream::new(reply_rx))))
    }
}
