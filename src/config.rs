//! Server configuration: defaults, optionally overlaid by a TOML file, then by
//! command-line flags.
//!
//! ```toml
//! bind = "0.0.0.0:65431"
//! start_dir = "/srv/share"
//! buffer_size = 4096
//! scan_mode = "chunk-tail"
//! confine = true
//! log_file = "/var/log/remfsd.log"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::ServerOpts;
use crate::framing::ScanMode;
use crate::protocol::{DEFAULT_BIND, DEFAULT_BUFFER_SIZE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    /// `None` means the process's current directory at startup.
    pub start_dir: Option<PathBuf>,
    pub buffer_size: usize,
    pub scan_mode: ScanMode,
    pub confine: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            start_dir: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            scan_mode: ScanMode::default(),
            confine: false,
            log_file: None,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let cfg: ServerConfig = toml::from_str(text).context("invalid server config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    /// File (if any) first, then flags on top.
    pub fn from_opts(opts: &ServerOpts) -> Result<Self> {
        let mut cfg = match &opts.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        cfg.apply(opts);
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply(&mut self, opts: &ServerOpts) {
        if let Some(bind) = &opts.bind {
            self.bind = bind.clone();
        }
        if let Some(dir) = &opts.start_dir {
            self.start_dir = Some(dir.clone());
        }
        if let Some(size) = opts.buffer_size {
            self.buffer_size = size;
        }
        if let Some(mode) = opts.scan_mode {
            self.scan_mode = mode;
        }
        if opts.confine {
            self.confine = true;
        }
        if let Some(log) = &opts.log_file {
            self.log_file = Some(log.clone());
        }
    }

    fn validate(&self) -> Result<()> {
        // The chunk-tail scan needs room for at least one whole delimiter
        if self.buffer_size < crate::protocol::TOKEN_LEN {
            anyhow::bail!(
                "buffer_size must be at least {} bytes, got {}",
                crate::protocol::TOKEN_LEN,
                self.buffer_size
            );
        }
        Ok(())
    }

    /// Canonical start directory, checked to exist and be a directory.
    pub fn resolve_start_dir(&self) -> Result<PathBuf> {
        let dir = match &self.start_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("cannot read current directory")?,
        };
        if !dir.exists() {
            anyhow::bail!("start directory does not exist: {}", dir.display());
        }
        if !dir.is_dir() {
            anyhow::bail!("start path is not a directory: {}", dir.display());
        }
        dir.canonicalize()
            .with_context(|| format!("failed to canonicalize start directory: {}", dir.display()))
    }
}
