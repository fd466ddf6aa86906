//! Shared CLI helpers and small reusable Clap fragments

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use crate::framing::ScanMode;
use crate::protocol::{DEFAULT_BUFFER_SIZE, TOKEN_LEN};

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Options for the `remfsd` server. Unset values fall back to the config file,
/// then to built-in defaults.
#[derive(Clone, Debug, Parser)]
#[command(name = "remfsd", version, about = "remfs file server")]
pub struct ServerOpts {
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Bind address (host:port) [default: 127.0.0.1:65431]
    #[arg(long)]
    pub bind: Option<String>,

    /// Directory every session starts in [default: current directory]
    #[arg(long)]
    pub start_dir: Option<PathBuf>,

    /// Bytes per socket read while scanning for the delimiter [default: 4096]
    #[arg(long, value_parser = parse_buffer_size)]
    pub buffer_size: Option<usize>,

    /// Delimiter scan strategy
    #[arg(long, value_enum)]
    pub scan_mode: Option<ScanMode>,

    /// Keep sessions inside the start directory
    #[arg(long)]
    pub confine: bool,

    /// Append session audit lines to this file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Console log format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Options for the interactive `remfs` client
#[derive(Clone, Debug, Parser)]
#[command(name = "remfs", version, about = "Interactive remfs client")]
pub struct ClientOpts {
    /// Server to connect to (host:port or remfs://host[:port])
    #[arg(default_value = "127.0.0.1:65431")]
    pub remote: String,

    /// Local directory for uploads and downloads [default: current directory]
    #[arg(long)]
    pub local_dir: Option<PathBuf>,

    /// Bytes per socket read while scanning for the delimiter
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE, value_parser = parse_buffer_size)]
    pub buffer_size: usize,

    /// Delimiter scan strategy
    #[arg(long, value_enum, default_value_t = ScanMode::Buffered)]
    pub scan_mode: ScanMode,

    /// Console log format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Read buffers smaller than one delimiter can never see a whole token.
fn parse_buffer_size(s: &str) -> std::result::Result<usize, String> {
    let size: usize = s.parse().map_err(|e| format!("{e}"))?;
    if size < TOKEN_LEN {
        return Err(format!("must be at least {TOKEN_LEN} bytes"));
    }
    Ok(size)
}

/// Install the global subscriber. `RUST_LOG` overrides `default_level`.
pub fn init_tracing(format: LogFormat, default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
