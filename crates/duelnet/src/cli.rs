//! Command-line argument parsing, config files and logging for the
//! `duelnet-server` and `duelnet-client` binaries.
//!
//! Precedence is CLI flag, then config file, then built-in default.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use duelnet_rendezvous::ClientConfig;
use duelnet_transport::Endpoint;
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

use crate::{DuelnetError, ServerConfig};

/// Log filter used when neither `--log-level` nor `RUST_LOG` is set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// `duelnet-server` arguments.
#[derive(Parser, Debug, Default)]
#[command(name = "duelnet-server", about = "Duelnet central matchmaking server")]
pub struct ServerArgs {
    /// Address to listen on, e.g. `0.0.0.0:60001` or `[::]:60001`.
    #[arg(long)]
    pub bind: Option<Endpoint>,

    /// JSON config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level or filter directives (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,
}

/// `duelnet-client` arguments.
#[derive(Parser, Debug, Default)]
#[command(name = "duelnet-client", about = "Duelnet peer-to-peer game client")]
pub struct ClientArgs {
    /// Central server address.
    #[arg(long)]
    pub server: Option<Endpoint>,

    /// Local port the client binds to. The other player connects here.
    #[arg(long)]
    pub port: Option<u16>,

    /// JSON config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level or filter directives (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl ServerConfig {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &ServerArgs) {
        if let Some(ref bind) = args.bind {
            self.bind = bind.clone();
        }
    }
}

/// Apply CLI overrides to a loaded client config.
pub fn apply_client_overrides(config: &mut ClientConfig, args: &ClientArgs) {
    if let Some(ref server) = args.server {
        config.central_server = server.clone();
    }
    if let Some(port) = args.port {
        config.own_endpoint.port = port;
    }
}

/// Reads a JSON config file, or returns the defaults when `path` is `None`.
/// Fields missing from the file keep their defaults.
pub fn load_config<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T, DuelnetError> {
    let Some(path) = path else {
        return Ok(T::default());
    };
    let text = fs::read_to_string(path).map_err(|source| DuelnetError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| DuelnetError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Builds the log filter: `--log-level` wins, then `RUST_LOG`, then
/// [`DEFAULT_LOG_LEVEL`].
pub fn log_filter(level: Option<&str>) -> EnvFilter {
    level
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

/// Installs the global `tracing` subscriber. Logs go to stderr so they do
/// not interleave with the client's console prompts.
pub fn init_logging(level: Option<&str>) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(level))
        .with_writer(std::io::stderr)
        .init();
}
