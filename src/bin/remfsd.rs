use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use remfs::cli::{init_tracing, ServerOpts};
use remfs::config::ServerConfig;

fn main() -> Result<()> {
    let opts = ServerOpts::parse();
    init_tracing(opts.log_format, "info")?;
    let cfg = ServerConfig::from_opts(&opts)?;

    info!(
        bind = %cfg.bind,
        confine = cfg.confine,
        buffer_size = cfg.buffer_size,
        "starting remfs daemon"
    );

    // Security warning for 0.0.0.0 binding
    if cfg.bind.starts_with("0.0.0.0") {
        warn!("binding to 0.0.0.0 exposes the server to all network interfaces");
        warn!("this protocol is UNENCRYPTED and UNAUTHENTICATED; only use on trusted networks");
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    rt.block_on(remfs::server::serve(&cfg))
}
