use greeter_client::{
    ClientConfig, ClientError, ConnectionReport, ConnectionState, connection::connect,
    greet_many_times, run, run_connection,
};
use greeter_core::{GreetingEntry, GreetingTable};
use greeter_server::{GreeterService, ServerConfig, run_server_with_incoming};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::Code;

fn small_table() -> GreetingTable {
    GreetingTable::new(vec![
        GreetingEntry::new("English", "Hello"),
        GreetingEntry::new("French", "Bonjour"),
    ])
}

async fn start_server(num_workers: usize, table: GreetingTable) -> (u16, GreeterService) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = ServerConfig {
        num_workers,
        shutdown_timeout: 1,
        server_addr: addr.to_string(),
        ..ServerConfig::default()
    };
    let service = GreeterService::new(config, table);
    tokio::spawn(run_server_with_incoming(
        TcpListenerStream::new(listener),
        service.clone(),
        std::future::pending::<()>(),
    ));
    (addr.port(), service)
}

/// Reserves a port, then frees it so nothing is listening there.
async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

fn client_config(port: u16, connection_count: usize, loop_count: usize) -> ClientConfig {
    ClientConfig {
        host: "127.0.0.1".to_string(),
        port,
        name: "world".to_string(),
        connection_count,
        loop_count,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn performs_connections_times_loops_cycles() {
    let (port, _service) = start_server(2, small_table()).await;

    let summary = run(client_config(port, 3, 4)).await;

    assert_eq!(summary.failed(), 0);
    assert_eq!(summary.cycles(), 12);
    assert_eq!(summary.replies(), 24);
    assert_eq!(summary.reports.len(), 3);
    for (i, report) in summary.reports.iter().enumerate() {
        assert_eq!(report.connection, i);
        assert_eq!(report.cycles, 4);
        assert_eq!(report.state, ConnectionState::Closed);
        assert!(report.is_ok());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn embedded_table_over_many_connections() {
    let (port, _service) = start_server(4, GreetingTable::embedded().unwrap()).await;

    let summary = run(client_config(port, 8, 3)).await;

    assert_eq!(summary.failed(), 0);
    assert_eq!(summary.cycles(), 24);
    assert_eq!(summary.replies(), 24 * 105);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_call_counts_every_reply() {
    let (port, _service) = start_server(1, small_table()).await;
    let mut client = connect(&client_config(port, 1, 1)).await.unwrap();
    let mut report = ConnectionReport::new(0);

    for _ in 0..2 {
        let received = greet_many_times(&mut client, "world-0".to_string(), &mut report)
            .await
            .unwrap();
        assert_eq!(received, 2);
    }

    assert_eq!(report.cycles, 2);
    assert_eq!(report.replies, 4);
    assert_eq!(report.state, ConnectionState::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn zero_connections_is_a_noop() {
    let summary = run(client_config(1, 0, 10)).await;
    assert!(summary.reports.is_empty());
    assert_eq!(summary.cycles(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unreachable_server_fails_each_connection() {
    let port = unused_port().await;

    let summary = run(client_config(port, 2, 3)).await;

    assert_eq!(summary.failed(), 2);
    assert_eq!(summary.cycles(), 0);
    for report in &summary.reports {
        assert_eq!(report.state, ConnectionState::Closed);
        assert!(matches!(report.error, Some(ClientError::Connect { .. })));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn refused_streams_end_their_connection_only() {
    let (port, service) = start_server(2, small_table()).await;
    service.shutdown().await.unwrap();

    let summary = run(client_config(port, 3, 5)).await;

    assert_eq!(summary.failed(), 3);
    assert_eq!(summary.cycles(), 0);
    for report in &summary.reports {
        match &report.error {
            Some(ClientError::Call(status)) => assert_eq!(status.code(), Code::Unavailable),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_connection_leaves_sibling_untouched() {
    let (port, _service) = start_server(2, small_table()).await;
    let healthy = Arc::new(client_config(port, 1, 5));
    let broken = Arc::new(client_config(unused_port().await, 1, 5));

    let (ok, failed) = tokio::join!(run_connection(0, healthy), run_connection(1, broken));

    assert!(ok.is_ok());
    assert_eq!(ok.cycles, 5);
    assert_eq!(ok.replies, 10);
    assert_eq!(ok.state, ConnectionState::Closed);

    assert!(matches!(failed.error, Some(ClientError::Connect { .. })));
    assert_eq!(failed.cycles, 0);
    assert_eq!(failed.state, ConnectionState::Closed);
}
