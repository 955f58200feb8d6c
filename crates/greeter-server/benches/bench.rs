use core::{fmt, hint::black_box};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use futures::stream::{FuturesUnordered, StreamExt};
use greeter_core::{
    GreetingTable,
    proto::{HelloRequest, greeter_client::GreeterClient},
};
use greeter_server::{GreeterService, ServerConfig, run_server_with_incoming};
use std::time::Instant;
use tokio::{net::TcpListener, runtime::Builder};
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{
    codec::CompressionEncoding,
    transport::{Channel, Uri},
};

#[derive(Clone, Copy, Debug)]
enum Compression {
    None,
    Gzip,
    Zstd,
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::Zstd => write!(f, "zstd"),
        }
    }
}

impl From<Compression> for Option<CompressionEncoding> {
    fn from(value: Compression) -> Self {
        match value {
            Compression::None => None,
            Compression::Gzip => Some(CompressionEncoding::Gzip),
            Compression::Zstd => Some(CompressionEncoding::Zstd),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct GrpcBenchParams {
    concurrency: usize,
    compression: Compression,
}

fn grpc_bench(c: &mut Criterion) {
    let rt = Builder::new_multi_thread().enable_all().build().unwrap();
    let table = GreetingTable::embedded().expect("embedded greetings");
    let table_len = table.len() as u64;

    // Serve in-process on an ephemeral port for the lifetime of the runtime.
    let uri: Uri = rt.block_on(async {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = ServerConfig {
            num_workers: 32,
            server_addr: addr.to_string(),
            ..ServerConfig::default()
        };
        let service = GreeterService::new(config, table);
        tokio::spawn(run_server_with_incoming(
            TcpListenerStream::new(listener),
            service,
            std::future::pending::<()>(),
        ));
        format!("http://{addr}").parse().unwrap()
    });

    let concurrency_cases = [1, 2, 4, 8, 16, 32];
    let compression_cases = [Compression::None, Compression::Zstd, Compression::Gzip];

    let mut cases = Vec::new();
    for &concurrency in &concurrency_cases {
        for &compression in &compression_cases {
            cases.push(GrpcBenchParams {
                concurrency,
                compression,
            });
        }
    }

    for params in &cases {
        let mut group = c.benchmark_group("grpc/lots_of_replies");
        group.throughput(Throughput::Elements(table_len * params.concurrency as u64));

        group.bench_function(
            format!("conc/{}/comp/{}", params.concurrency, params.compression),
            |b| {
                b.to_async(&rt).iter_custom(|iters| {
                    let uri = uri.clone();
                    async move {
                        let channel = Channel::builder(uri)
                            .connect()
                            .await
                            .expect("Failed to connect to server");

                        let start = Instant::now();

                        for _ in 0..iters {
                            run_greeting_bench(&channel, params).await;
                        }

                        start.elapsed()
                    }
                });
            },
        );

        group.finish();
    }
}

async fn run_greeting_bench(channel: &Channel, params: &GrpcBenchParams) {
    let mut tasks = FuturesUnordered::new();

    for i in 0..params.concurrency {
        let channel = channel.clone();
        let compression = params.compression;

        tasks.push(tokio::spawn(async move {
            let mut client = GreeterClient::new(channel);
            if let Some(encoding) = compression.into() {
                client = client.accept_compressed(encoding).send_compressed(encoding)
            }

            let mut stream = client
                .lots_of_replies(HelloRequest {
                    name: format!("bench-{i}"),
                })
                .await
                .expect("stream call failed")
                .into_inner();

            while let Some(reply) = stream.message().await.expect("reply") {
                black_box(reply.message);
            }
        }));
    }

    while let Some(res) = tasks.next().await {
        res.unwrap();
    }
}

criterion_group!(grpc_benches, grpc_bench);
criterion_main!(grpc_benches);
