use clap::Parser;
use greeter_core::GreetingTable;
use greeter_server::{
    CliArgs, GreeterService, ServerConfig, run_server_with_incoming,
    server::telemetry::init_telemetry,
};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_stream::wrappers::TcpListenerStream;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry()?;

    // The table is parsed before binding so a bad blob never leaves a
    // half-started server behind.
    let table = GreetingTable::embedded()
        .inspect_err(|e| tracing::error!("Failed to load greetings: {e}"))?;

    let tcp = TcpListener::bind(&config.server_addr).await?;
    let incoming = TcpListenerStream::new(tcp);
    log_startup_info(&config, &table);

    let service = GreeterService::new(config, table);
    let res = run_server_with_incoming(incoming, service, shutdown_signal()).await;

    providers.shutdown();
    res
}

fn log_startup_info(config: &ServerConfig, table: &GreetingTable) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting greeter on {} with {} greetings and full config: {:#?}",
            config.server_addr,
            table.len(),
            config
        );
    } else {
        tracing::info!(
            "Starting greeter on {} with {} stream workers",
            config.server_addr,
            config.num_workers
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }
}
