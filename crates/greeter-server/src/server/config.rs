use anyhow::bail;
use clap::Parser;

/// Runtime configuration for the `greeter-server` binary.
///
/// The only positional argument is the worker pool size. Every other knob is
/// an optional flag with an environment variable fallback.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "greeter-server",
    version,
    about = "A gRPC service streaming localized greetings"
)]
pub struct CliArgs {
    /// Number of worker tasks servicing streaming calls.
    ///
    /// Each worker handles one `LotsOfReplies` stream at a time. Streams wait
    /// in a shared queue and go to whichever worker is idle first.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(env = "NUM_WORKERS", default_value_t = 1)]
    pub num_workers: usize,

    /// Maximum number of concurrent HTTP/2 streams per connection.
    ///
    /// Calls beyond this limit are queued by the transport.
    ///
    /// Environment variable: `MAX_CONCURRENT_STREAMS`
    #[arg(long, env = "MAX_CONCURRENT_STREAMS", default_value_t = 1000)]
    pub max_concurrent_streams: u32,

    /// Capacity of the reply buffer between a worker and its gRPC stream.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 8)]
    pub stream_buffer_size: usize,

    /// Seconds to wait for in-flight streams to drain during shutdown.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,

    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:50051"))]
    pub server_addr: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub num_workers: usize,
    pub max_concurrent_streams: u32,
    pub stream_buffer_size: usize,
    pub shutdown_timeout: u64,
    pub server_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            num_workers: 1,
            max_concurrent_streams: 1000,
            stream_buffer_size: 8,
            shutdown_timeout: 3,
            server_addr: String::from("0.0.0.0:50051"),
        }
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.num_workers == 0 {
            bail!("NUM_WORKERS must be greater than 0");
        }

        if args.max_concurrent_streams == 0 {
            bail!("MAX_CONCURRENT_STREAMS must be greater than 0");
        }

        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        Ok(Self {
            num_workers: args.num_workers,
            max_concurrent_streams: args.max_concurrent_streams,
            stream_buffer_size: args.stream_buffer_size,
            shutdown_timeout: args.shutdown_timeout,
            server_addr: args.server_addr,
        })
    }
}
