use anyhow::bail;
use clap::Parser;

/// Command line of the `greeter-client` binary.
///
/// All positional arguments are optional and must be given in order. A count
/// that is not a non-negative integer is rejected before any connection is
/// attempted.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "greeter-client",
    version,
    about = "Fans out concurrent streaming calls against a greeter server"
)]
pub struct CliArgs {
    /// Server host name or IP address.
    #[arg(default_value_t = String::from("localhost"))]
    pub host: String,

    /// Base name sent with every request. The iteration index is appended as
    /// `<name>-<i>`.
    #[arg(default_value_t = String::from("world"))]
    pub name: String,

    /// Number of parallel connections.
    #[arg(default_value_t = 1)]
    pub connection_count: usize,

    /// Number of sequential streaming calls per connection.
    #[arg(default_value_t = 10)]
    pub loop_count: usize,

    /// Server port.
    ///
    /// Environment variable: `GREETER_PORT`
    #[arg(long, env = "GREETER_PORT", default_value_t = 50051)]
    pub port: u16,
}

/// Immutable client settings shared by every connection task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub connection_count: usize,
    pub loop_count: usize,
}

impl ClientConfig {
    /// URI dialled by every connection (plaintext HTTP/2).
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Name sent on iteration `iteration` of a connection.
    pub fn request_name(&self, iteration: usize) -> String {
        format!("{}-{}", self.name, iteration)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::from("localhost"),
            port: 50051,
            name: String::from("world"),
            connection_count: 1,
            loop_count: 10,
        }
    }
}

impl TryFrom<CliArgs> for ClientConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.host.is_empty() {
            bail!("HOST must not be empty");
        }

        Ok(Self {
            host: args.host,
            port: args.port,
            name: args.name,
            connection_count: args.connection_count,
            loop_count: args.loop_count,
        })
    }
}
