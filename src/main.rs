//! folio-ssh server
//!
//! Serve an interactive portfolio to anyone who connects over SSH.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use folio_ssh::server::{serve, shutdown_signal};
use folio_ssh::tui::run::SystemLauncher;
use folio_ssh::types::ServeConfig;

#[derive(Parser)]
#[command(name = "folio-ssh")]
#[command(about = "Serve an interactive portfolio over SSH")]
#[command(version)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "FOLIO_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "FOLIO_PORT", default_value_t = 22)]
    port: u16,

    /// Host private key (OpenSSH format); generated if missing
    #[arg(long, env = "FOLIO_HOST_KEY", default_value = ".ssh/id_ed25519")]
    host_key: PathBuf,

    /// Seconds open sessions get to finish after a shutdown signal
    #[arg(long, env = "FOLIO_GRACE_SECS", default_value_t = 30)]
    grace_secs: u64,

    /// Drop connections idle for this many seconds
    #[arg(long, env = "FOLIO_IDLE_SECS", default_value_t = 3600)]
    idle_secs: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl From<&Cli> for ServeConfig {
    fn from(cli: &Cli) -> Self {
        ServeConfig {
            addr: SocketAddr::new(cli.host, cli.port),
            host_key_path: cli.host_key.clone(),
            grace_period: Duration::from_secs(cli.grace_secs),
            idle_timeout: Duration::from_secs(cli.idle_secs),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match serve(ServeConfig::from(&cli), Arc::new(SystemLauncher), shutdown_signal()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "could not start server");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_server_config() {
        let cli = Cli::try_parse_from(["folio-ssh"]).unwrap();
        let config = ServeConfig::from(&cli);
        let default = ServeConfig::default();
        assert_eq!(config.addr, default.addr);
        assert_eq!(config.host_key_path, default.host_key_path);
        assert_eq!(config.grace_period, default.grace_period);
        assert_eq!(config.idle_timeout, default.idle_timeout);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "folio-ssh",
            "--host",
            "127.0.0.1",
            "--port",
            "2222",
            "--grace-secs",
            "5",
        ])
        .unwrap();
        let config = ServeConfig::from(&cli);
        assert_eq!(config.addr, SocketAddr::from(([127, 0, 0, 1], 2222)));
        assert_eq!(config.grace_period, Duration::from_secs(5));
    }
}
