//! TCP accept loop. One tokio task per connection; tasks share nothing
//! mutable, only the read-only `SessionContext`.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::ProtocolError;
use crate::fs::{Filesystem, LocalFs};
use crate::logger::{Logger, NoopLogger, TextLogger};
use crate::session::{Session, SessionContext};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

impl SessionContext {
    pub fn from_config(cfg: &ServerConfig) -> Result<Self> {
        let start_dir = cfg.resolve_start_dir()?;
        let local = if cfg.confine {
            LocalFs::confined(&start_dir)
        } else {
            LocalFs::new()
        };
        if let Some(root) = local.root() {
            info!(root = %root.display(), "sessions confined to root");
        }
        let fs: Arc<dyn Filesystem> = Arc::new(local);
        let logger: Arc<dyn Logger> = match &cfg.log_file {
            Some(path) => Arc::new(
                TextLogger::new(path)
                    .with_context(|| format!("cannot open log file {}", path.display()))?,
            ),
            None => Arc::new(NoopLogger),
        };
        Ok(Self {
            fs,
            logger,
            start_dir,
            buffer_size: cfg.buffer_size,
            scan_mode: cfg.scan_mode,
        })
    }
}

pub async fn serve(cfg: &ServerConfig) -> Result<()> {
    let ctx = SessionContext::from_config(cfg)?;
    let listener = TcpListener::bind(&cfg.bind)
        .await
        .with_context(|| format!("bind {}", cfg.bind))?;
    serve_listener(listener, ctx).await
}

/// Accept forever on an already bound listener.
pub async fn serve_listener(listener: TcpListener, ctx: SessionContext) -> Result<()> {
    info!(
        addr = %listener.local_addr()?,
        start_dir = %ctx.start_dir.display(),
        scan_mode = ?ctx.scan_mode,
        "remfs server listening"
    );
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                // EMFILE and friends persist until a connection closes
                warn!(error = %e, "accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        let _ = stream.set_nodelay(true);
        info!(%peer, "connection");
        let ctx = ctx.clone();
        tokio::spawn(async move {
            handle_connection(stream, peer, ctx).await;
        });
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, ctx: SessionContext) {
    let session = match Session::open(stream, Some(peer), &ctx).await {
        Ok(session) => session,
        Err(e) => {
            warn!(%peer, error = %e, "handshake failed");
            return;
        }
    };
    let id = session.id();
    match session.run().await {
        Ok(()) => info!(%peer, session = %id, "connection closed"),
        Err(ProtocolError::Disconnected) => info!(%peer, session = %id, "peer went away"),
        Err(e) => error!(%peer, session = %id, error = %e, "session ended"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FsError;

    #[test]
    fn test_from_config_confines_sessions() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = ServerConfig {
            start_dir: Some(tmp.path().to_path_buf()),
            confine: true,
            ..ServerConfig::default()
        };
        let ctx = SessionContext::from_config(&cfg).unwrap();
        assert!(matches!(
            ctx.fs.change_directory(&ctx.start_dir, ".."),
            Err(FsError::OutsideRoot { .. })
        ));

        let open = ServerConfig {
            confine: false,
            ..cfg
        };
        let ctx = SessionContext::from_config(&open).unwrap();
        assert!(ctx.fs.change_directory(&ctx.start_dir, "..").is_ok());
    }
}
