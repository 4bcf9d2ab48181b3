use clap::{Parser, ValueEnum};
use referral_generator::MIN_RANDOM_BYTES;
use referral_telemetry::LogFormat;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

pub const LISTEN_ADDR_ENV: &str = "REFERRAL_GATEWAY_LISTEN_ADDR";
pub const STORAGE_BACKEND_ENV: &str = "REFERRAL_GATEWAY_STORAGE_BACKEND";
pub const POSTGRES_DSN_ENV: &str = "REFERRAL_GATEWAY_POSTGRES_DSN";
pub const POSTGRES_MAX_CONNECTIONS_ENV: &str = "REFERRAL_GATEWAY_POSTGRES_MAX_CONNECTIONS";
pub const RANDOM_BYTES_ENV: &str = "REFERRAL_GATEWAY_RANDOM_BYTES";
pub const MAX_ATTEMPTS_ENV: &str = "REFERRAL_GATEWAY_MAX_ATTEMPTS";
pub const DEADLINE_MS_ENV: &str = "REFERRAL_GATEWAY_DEADLINE_MS";
pub const STORE_BACKOFF_MS_ENV: &str = "REFERRAL_GATEWAY_STORE_BACKOFF_MS";
pub const REWARD_POINTS_ENV: &str = "REFERRAL_GATEWAY_REWARD_POINTS";
pub const CORS_ORIGINS_ENV: &str = "REFERRAL_GATEWAY_CORS_ORIGINS";
pub const LOG_FORMAT_ENV: &str = "REFERRAL_GATEWAY_LOG_FORMAT";
pub const OTLP_ENDPOINT_ENV: &str = "REFERRAL_GATEWAY_OTLP_ENDPOINT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
pub const MAX_RANDOM_BYTES: u64 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "postgres")]
    Postgres,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Postgres => write!(f, "postgres"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "referral-gateway-http-server")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = POSTGRES_DSN_ENV, required_if_eq("storage", "postgres"))]
    pub postgres_dsn: Option<String>,

    #[arg(long, env = POSTGRES_MAX_CONNECTIONS_ENV, default_value_t = 10)]
    pub postgres_max_connections: u32,

    /// Random bytes per code; the code carries twice as many hex characters.
    #[arg(
        long,
        env = RANDOM_BYTES_ENV,
        default_value_t = 8,
        value_parser = clap::value_parser!(u64).range((MIN_RANDOM_BYTES as u64)..=MAX_RANDOM_BYTES)
    )]
    pub random_bytes: u64,

    #[arg(
        long,
        env = MAX_ATTEMPTS_ENV,
        default_value_t = 16,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_attempts: u32,

    #[arg(
        long,
        env = DEADLINE_MS_ENV,
        default_value_t = 5000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub deadline_ms: u64,

    #[arg(long, env = STORE_BACKOFF_MS_ENV, default_value_t = 50)]
    pub store_backoff_ms: u64,

    #[arg(long, env = REWARD_POINTS_ENV, default_value_t = 10)]
    pub reward_points: i64,

    #[arg(
        long,
        env = CORS_ORIGINS_ENV,
        value_delimiter = ',',
        default_value = DEFAULT_CORS_ORIGIN
    )]
    pub cors_origins: Vec<String>,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,

    #[arg(long, env = OTLP_ENDPOINT_ENV)]
    pub otlp_endpoint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<CLI, clap::Error> {
        CLI::try_parse_from(std::iter::once("gateway").chain(args.iter().copied()))
    }

    #[test]
    fn command_is_well_formed() {
        CLI::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = parse(&[]).unwrap();
        assert_eq!(cli.random_bytes, 8);
        assert_eq!(cli.max_attempts, 16);
        assert_eq!(cli.deadline_ms, 5000);
        assert_eq!(cli.storage, StorageBackendArg::InMemory);
        assert_eq!(cli.cors_origins, vec![DEFAULT_CORS_ORIGIN.to_string()]);
    }

    #[test]
    fn rejects_out_of_range_generation_bounds() {
        assert!(parse(&["--random-bytes", "0"]).is_err());
        assert!(parse(&["--random-bytes", "3"]).is_err());
        assert!(parse(&["--random-bytes", "65"]).is_err());
        assert!(parse(&["--deadline-ms", "0"]).is_err());
        assert!(parse(&["--max-attempts", "0"]).is_err());

        let cli = parse(&["--random-bytes", "4", "--deadline-ms", "1"]).unwrap();
        assert_eq!(cli.random_bytes, 4);
        assert_eq!(cli.deadline_ms, 1);
    }

    #[test]
    fn postgres_backend_requires_dsn() {
        assert!(parse(&["--storage", "postgres"]).is_err());
        let cli = parse(&["--storage", "postgres", "--postgres-dsn", "postgres://localhost/referral"])
            .unwrap();
        assert_eq!(cli.storage, StorageBackendArg::Postgres);
    }
}
