use clap::Parser;
use greeter_client::{CliArgs, ClientConfig, telemetry::init_logging};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ClientConfig::try_from(args)?;

    init_logging()?;

    tracing::info!(
        "Connecting to {} with {} connections x {} calls",
        config.endpoint(),
        config.connection_count,
        config.loop_count
    );

    let summary = greeter_client::run(config).await;

    tracing::info!(
        "{} cycles, {} replies, {} failed connections",
        summary.cycles(),
        summary.replies(),
        summary.failed()
    );
    println!("duration: {:?}", summary.elapsed);

    Ok(())
}
