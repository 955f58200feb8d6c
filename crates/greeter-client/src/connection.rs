//! A single client connection and the streaming calls it issues.
//!
//! A connection moves through
//! `Idle -> Connecting -> (Requesting -> Streaming -> Idle) x L -> Closed`.
//! Any error jumps straight to `Closed` and ends that connection only.

use crate::{
    config::ClientConfig,
    error::{ClientError, Result},
};
use greeter_core::proto::{HelloReply, HelloRequest, greeter_client::GreeterClient};
use std::sync::Arc;
use tonic::{
    Streaming,
    transport::{Channel, Endpoint},
};

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Requesting,
    Streaming,
    Closed,
}

/// Outcome of one connection.
#[derive(Debug)]
pub struct ConnectionReport {
    pub connection: usize,
    /// Completed request/stream cycles.
    pub cycles: usize,
    /// Replies received across all cycles, including a partially read one.
    pub replies: usize,
    pub state: ConnectionState,
    pub error: Option<ClientError>,
}

impl ConnectionReport {
    /// A fresh report for `connection`, in the `Idle` state.
    pub fn new(connection: usize) -> Self {
        Self {
            connection,
            cycles: 0,
            replies: 0,
            state: ConnectionState::Idle,
            error: None,
        }
    }

    pub(crate) fn failed(connection: usize, error: ClientError) -> Self {
        Self {
            state: ConnectionState::Closed,
            error: Some(error),
            ..Self::new(connection)
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    fn transition(&mut self, next: ConnectionState) {
        tracing::trace!(
            "connection {}: {:?} -> {:?}",
            self.connection,
            self.state,
            next
        );
        self.state = next;
    }
}

/// Opens the channel for `config`.
///
/// # Errors
///
/// Returns [`ClientError::Connect`] if the endpoint is invalid or unreachable.
pub async fn connect(config: &ClientConfig) -> Result<GreeterClient<Channel>> {
    let endpoint = config.endpoint();
    let channel = Endpoint::from_shared(endpoint.clone())
        .map_err(|source| ClientError::Connect {
            endpoint: endpoint.clone(),
            source,
        })?
        .connect()
        .await
        .map_err(|source| ClientError::Connect { endpoint, source })?;

    Ok(GreeterClient::new(channel))
}

/// Issues one `LotsOfReplies` call and drains it, logging every reply.
///
/// Walks `report` through `Requesting -> Streaming -> Idle` and adds every
/// reply to `report.replies` as it arrives, so a stream that fails part-way is
/// still accounted for. Returns the number of replies this call received.
///
/// # Errors
///
/// Returns [`ClientError::Call`] if the call is rejected or the stream fails
/// mid-way. The cycle is not counted in that case.
pub async fn greet_many_times(
    client: &mut GreeterClient<Channel>,
    name: String,
    report: &mut ConnectionReport,
) -> Result<usize> {
    report.transition(ConnectionState::Requesting);
    let mut stream = client
        .lots_of_replies(HelloRequest { name })
        .await?
        .into_inner();

    report.transition(ConnectionState::Streaming);
    let before = report.replies;
    drain(&mut stream, &mut report.replies).await?;

    report.cycles += 1;
    report.transition(ConnectionState::Idle);
    Ok(report.replies - before)
}

/// Reads `stream` until the server closes it, counting into `received` so a
/// failed stream still accounts for what it delivered.
async fn drain(stream: &mut Streaming<HelloReply>, received: &mut usize) -> Result<()> {
    while let Some(reply) = stream.message().await? {
        tracing::info!("{}", reply.message);
        *received += 1;
    }
    Ok(())
}

/// Runs one connection: connect once, then `loop_count` sequential streaming
/// calls named `<name>-<i>`.
///
/// Never fails; the first error is logged, stored in the report and ends the
/// connection.
pub async fn run_connection(connection: usize, config: Arc<ClientConfig>) -> ConnectionReport {
    let mut report = ConnectionReport::new(connection);

    if let Err(e) = drive(&config, &mut report).await {
        tracing::error!("connection {connection}: {e}");
        report.error = Some(e);
    }

    report.transition(ConnectionState::Closed);
    report
}

async fn drive(config: &ClientConfig, report: &mut ConnectionReport) -> Result<()> {
    report.transition(ConnectionState::Connecting);
    let mut client = connect(config).await?;
    report.transition(ConnectionState::Idle);

    for i in 0..config.loop_count {
        greet_many_times(&mut client, config.request_name(i), report).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_report_is_closed() {
        let report = ConnectionReport::failed(
            3,
            ClientError::Call(tonic::Status::unavailable("Service is shutting down")),
        );
        assert_eq!(report.connection, 3);
        assert_eq!(report.state, ConnectionState::Closed);
        assert_eq!(report.cycles, 0);
        assert!(!report.is_ok());
    }

    #[tokio::test]
    async fn invalid_endpoint_is_a_connect_error() {
        let config = ClientConfig {
            host: "bad host".to_string(),
            ..ClientConfig::default()
        };
        let err = connect(&config).await.unwrap_err();
        assert!(matches!(err, ClientError::Connect { .. }));
    }
}
