use anyhow::bail;
use clap::Parser;
use mintflake::SnowflakeId;

use crate::types::MAX_TOKEN_LEN;

/// Runtime configuration for the `mintflake-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file is loaded first). The identity of an instance (`worker_id`,
/// `datacenter_id`) is fixed for the lifetime of the process; every instance
/// sharing an ID namespace must use a distinct pair.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "mintflake-server",
    version,
    about = "A coordination-free service for Snowflake-like 64-bit IDs"
)]
pub struct CliArgs {
    /// Worker ID embedded in every ID (0-31).
    ///
    /// Environment variable: `WORKER_ID`
    #[arg(short = 'w', long, env = "WORKER_ID", default_value_t = 0)]
    pub worker_id: u64,

    /// Datacenter ID embedded in every ID (0-31).
    ///
    /// Environment variable: `DATACENTER_ID`
    #[arg(short = 'd', long, env = "DATACENTER_ID", default_value_t = 0)]
    pub datacenter_id: u64,

    /// Address to listen on (TCP, or a Unix socket path with --uds).
    ///
    /// Example: "0.0.0.0:4444" or "/tmp/mintflake.sock"
    ///
    /// Environment variable: `LISTEN_ADDR`
    #[arg(short = 'l', long, env = "LISTEN_ADDR", default_value_t = String::from("0.0.0.0:4444"))]
    pub listen: String,

    /// Unix time (ms) of the last ID this instance is known to have minted.
    ///
    /// IDs are refused until the clock passes it. Set this when restarting on
    /// a host whose clock may have been stepped back in the meantime.
    ///
    /// Environment variable: `LAST_TIMESTAMP`
    #[arg(short = 't', long, env = "LAST_TIMESTAMP")]
    pub last_timestamp: Option<u64>,

    /// Shared secret clients must present before their first request. Unset
    /// or empty disables authentication. Ignored in HTTP mode.
    ///
    /// Environment variable: `AUTH_TOKEN`
    #[arg(long, env = "AUTH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Serve one request per HTTP `POST /` instead of persistent streams.
    ///
    /// Environment variable: `HTTP_MODE`
    #[arg(long, env = "HTTP_MODE", default_value_t = false)]
    pub http: bool,

    /// Listen on a Unix socket instead of TCP. If set, `LISTEN_ADDR` must be a
    /// file path.
    #[arg(short, long, default_value_t = false)]
    pub uds: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub worker_id: u64,
    pub datacenter_id: u64,
    pub listen: String,
    pub last_timestamp: Option<u64>,
    pub token: Option<String>,
    pub http: bool,
    pub uds: bool,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.worker_id > SnowflakeId::MAX_WORKER_ID {
            bail!(
                "WORKER_ID must be between 0 and {}",
                SnowflakeId::MAX_WORKER_ID
            );
        }

        if args.datacenter_id > SnowflakeId::MAX_DATACENTER_ID {
            bail!(
                "DATACENTER_ID must be between 0 and {}",
                SnowflakeId::MAX_DATACENTER_ID
            );
        }

        let token = args.token.filter(|t| !t.is_empty());
        if let Some(token) = &token {
            if token.len() > MAX_TOKEN_LEN {
                bail!(
                    "AUTH_TOKEN is {} bytes, the handshake allows at most {}",
                    token.len(),
                    MAX_TOKEN_LEN
                );
            }
        }

        if args.http && args.uds {
            bail!("--http and --uds cannot be combined");
        }

        Ok(Self {
            worker_id: args.worker_id,
            datacenter_id: args.datacenter_id,
            listen: args.listen,
            last_timestamp: args.last_timestamp,
            token,
            http: args.http,
            uds: args.uds,
        })
    }
}
