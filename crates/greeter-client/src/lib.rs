//! # `greeter-client`
//!
//! Drives a greeter server with `connection_count` parallel connections, each
//! issuing `loop_count` sequential `LotsOfReplies` calls and draining every
//! reply. Connections share nothing but the immutable [`ClientConfig`]; a
//! failure on one connection never affects the others.

pub mod config;
pub mod connection;
pub mod error;
pub mod telemetry;

pub use config::{CliArgs, ClientConfig};
pub use connection::{ConnectionReport, ConnectionState, greet_many_times, run_connection};
pub use error::{ClientError, Result};

use futures::stream::{FuturesUnordered, StreamExt};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// Aggregate outcome of a [`run`].
#[derive(Debug)]
pub struct RunSummary {
    /// One report per connection, ordered by connection index.
    pub reports: Vec<ConnectionReport>,
    /// Wall-clock time from the first spawn until the last connection closed.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Completed request/stream cycles across all connections.
    pub fn cycles(&self) -> usize {
        self.reports.iter().map(|r| r.cycles).sum()
    }

    /// Replies received across all connections.
    pub fn replies(&self) -> usize {
        self.reports.iter().map(|r| r.replies).sum()
    }

    /// Connections that ended with an error.
    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| !r.is_ok()).count()
    }
}

/// Runs every configured connection concurrently and waits for all of them.
pub async fn run(config: ClientConfig) -> RunSummary {
    let config = Arc::new(config);
    let start = Instant::now();

    let mut tasks = FuturesUnordered::new();
    for connection in 0..config.connection_count {
        let handle = tokio::spawn(run_connection(connection, Arc::clone(&config)));
        tasks.push(async move { (connection, handle.await) });
    }

    let mut reports = Vec::with_capacity(config.connection_count);
    while let Some((connection, res)) = tasks.next().await {
        match res {
            Ok(report) => reports.push(report),
            Err(e) => {
                tracing::error!("connection {connection}: task failed: {e}");
                reports.push(ConnectionReport::failed(connection, e.into()));
            }
        }
    }

    let elapsed = start.elapsed();
    reports.sort_by_key(|r| r.connection);

    RunSummary { reports, elapsed }
}
