//! # `greeter-server`
//!
//! A gRPC server answering `SayHello` with a single greeting and
//! `LotsOfReplies` with a stream of localized greetings, one per entry of the
//! embedded greeting table.
//!
//! Streaming calls are served by a fixed-size pool of Tokio worker tasks; the
//! number of concurrent HTTP/2 streams per connection is capped by
//! `max_concurrent_streams`. Health checking, reflection, gRPC-Web and
//! response compression are enabled alongside the greeter service.

pub mod server;

pub use server::{
    config::{CliArgs, ServerConfig},
    service::handler::GreeterService,
};

use futures::Stream;
use greeter_core::proto::{FILE_DESCRIPTOR_SET, greeter_server::GreeterServer};
use tokio::io::{AsyncRead, AsyncWrite};
use tonic::transport::server::Connected;
use tonic::{codec::CompressionEncoding, transport::Server};
use tonic_reflection::server::Builder;
use tonic_web::GrpcWebLayer;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

/// Serves `service` on `incoming` until `shutdown` resolves.
///
/// Once `shutdown` completes the health status flips to `NOT_SERVING` and the
/// worker pool drains before the transport stops.
///
/// # Errors
///
/// Returns an error if reflection cannot be built or the transport fails.
pub async fn run_server_with_incoming<I, IO, IE, F>(
    incoming: I,
    service: GreeterService,
    shutdown: F,
) -> anyhow::Result<()>
where
    I: Stream<Item = Result<IO, IE>>,
    IO: AsyncRead + AsyncWrite + Connected + Unpin + Send + 'static,
    IE: Into<tower::BoxError>,
    F: Future<Output = ()>,
{
    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<GreeterServer<GreeterService>>()
        .await;

    let reflection = Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    let max_concurrent_streams = service.config().max_concurrent_streams;

    let signal = {
        let service = service.clone();
        async move {
            shutdown.await;
            tracing::info!("Shutdown signal received, terminating gracefully...");

            // 1. Publish the status
            health_reporter
                .set_not_serving::<GreeterServer<GreeterService>>()
                .await;

            // 2. Drain and stop the worker pool
            if let Err(e) = service.shutdown().await {
                tracing::error!("Error during service shutdown: {:?}", e);
            }
        }
    };

    Server::builder()
        .accept_http1(true)
        .http2_adaptive_window(Some(true))
        .max_concurrent_streams(max_concurrent_streams)
        .layer(
            ServiceBuilder::new()
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(GrpcWebLayer::new()),
        )
        .add_service(health_service)
        .add_service(reflection)
        .add_service(build_greeter_service(service))
        .serve_with_incoming_shutdown(incoming, signal)
        .await?;

    tracing::info!("Service shut down successfully");
    Ok(())
}

fn build_greeter_service(service: GreeterService) -> GreeterServer<GreeterService> {
    GreeterServer::new(service)
        .send_compressed(CompressionEncoding::Zstd)
        .send_compressed(CompressionEncoding::Gzip)
        .send_compressed(CompressionEncoding::Deflate)
        .accept_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Gzip)
        .accept_compressed(CompressionEncoding::Deflate)
}
