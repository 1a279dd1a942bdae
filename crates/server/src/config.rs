// crates/server/src/config.rs
//! Command-line configuration for the `datajobs` binary.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use datajobs_store::StoreConfig;

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 47880;

/// Get the default port from the environment, falling back to [`DEFAULT_PORT`].
///
/// Checks `DATAJOBS_PORT` first, then `PORT`.
pub fn get_port() -> u16 {
    std::env::var("DATAJOBS_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

#[derive(Debug, Clone, Parser)]
#[command(name = "datajobs", version, about = "Data processing job server")]
pub struct ServerConfig {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on. Defaults to $DATAJOBS_PORT, then $PORT, then 47880.
    #[arg(long, default_value_t = get_port())]
    pub port: u16,

    /// Simulated per-file processing time in milliseconds.
    #[arg(long, default_value_t = 500)]
    pub processing_delay_ms: u64,

    /// Override both store lock timeouts, in seconds.
    #[arg(long)]
    pub lock_timeout_secs: Option<u64>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("invalid listen address {addr}: {e}"))
    }

    pub fn processing_delay(&self) -> Duration {
        Duration::from_millis(self.processing_delay_ms)
    }

    /// Store settings: the CLI flag wins over `DATAJOBS_LOCK_TIMEOUT_SECS`.
    pub fn store_config(&self) -> StoreConfig {
        match self.lock_timeout_secs {
            Some(secs) => StoreConfig::with_lock_timeout(Duration::from_secs(secs)),
            None => StoreConfig::from_env(),
        }
    }
}
