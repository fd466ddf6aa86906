//! Server side of one connection: handshake, then one command per round trip
//! until the client disconnects.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::command::Command;
use crate::error::{FsError, Result};
use crate::framing::{Framed, ScanMode};
use crate::fs::Filesystem;
use crate::handshake;
use crate::logger::{Direction, Logger};
use crate::protocol::MISSING_FILE_TEXT;
use crate::snapshot;

/// Read-only state every session on a server starts from.
#[derive(Clone)]
pub struct SessionContext {
    pub fs: Arc<dyn Filesystem>,
    pub logger: Arc<dyn Logger>,
    pub start_dir: PathBuf,
    pub buffer_size: usize,
    pub scan_mode: ScanMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

pub struct Session<S> {
    id: Uuid,
    framed: Framed<S>,
    cwd: PathBuf,
    fs: Arc<dyn Filesystem>,
    logger: Arc<dyn Logger>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Send the delimiter and the initial snapshot.
    pub async fn open(mut stream: S, peer: Option<SocketAddr>, ctx: &SessionContext) -> Result<Self> {
        let id = Uuid::new_v4();
        if let Some(peer) = peer {
            ctx.logger.connect(id, peer);
        }
        let delimiter = handshake::offer(&mut stream).await?;
        debug!(session = %id, token = %delimiter, "delimiter sent");

        let framed = Framed::new(stream, delimiter)
            .with_buffer_size(ctx.buffer_size)
            .with_scan_mode(ctx.scan_mode);
        let mut session = Self {
            id,
            framed,
            cwd: ctx.start_dir.clone(),
            fs: Arc::clone(&ctx.fs),
            logger: Arc::clone(&ctx.logger),
        };
        session.send_snapshot().await?;
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Serve commands until the client disconnects or the transport fails.
    pub async fn run(mut self) -> Result<()> {
        let result = self.serve().await;
        let reason = match &result {
            Ok(()) => "client exit".to_string(),
            Err(e) => e.to_string(),
        };
        self.logger.disconnect(self.id, &reason);
        result
    }

    async fn serve(&mut self) -> Result<()> {
        loop {
            let line = self.framed.receive_text().await?;
            self.logger.command(self.id, &line);
            match self.handle(&line).await? {
                Flow::Continue => self.send_snapshot().await?,
                Flow::Close => {
                    info!(session = %self.id, "closing on client request");
                    // Peer may already be gone
                    let _ = self.framed.shutdown().await;
                    return Ok(());
                }
            }
        }
    }

    /// Execute one command line. Filesystem failures are logged and the
    /// session carries on; only transport failures are returned.
    pub async fn handle(&mut self, line: &str) -> Result<Flow> {
        let command = Command::parse(line);
        debug!(session = %self.id, %command, "dispatch");
        let outcome = match &command {
            Command::Cd(target) => self.fs.change_directory(&self.cwd, target).map(|dir| {
                self.cwd = dir;
            }),
            Command::Mkdir(name) => self.fs.create_directory(&self.cwd, name),
            Command::Rm(name) => self.fs.remove(&self.cwd, name),
            Command::Upload(name) => self.receive_upload(name).await?,
            Command::Download(name) => self.send_download(name).await?,
            Command::Disconnect => return Ok(Flow::Close),
        };
        if let Err(e) = outcome {
            warn!(session = %self.id, %command, error = %e, "command failed");
            self.logger.fs_error(self.id, line, &e.to_string());
        }
        Ok(Flow::Continue)
    }

    async fn receive_upload(&mut self, name: &str) -> Result<std::result::Result<(), FsError>> {
        let data = self.framed.receive().await?;
        let written = self.fs.write_file(&self.cwd, name, &data);
        if written.is_ok() {
            self.logger
                .transfer(self.id, Direction::Upload, &self.cwd.join(name), data.len() as u64);
        }
        Ok(written)
    }

    async fn send_download(&mut self, name: &str) -> Result<std::result::Result<(), FsError>> {
        match self.fs.read_file(&self.cwd, name) {
            Ok(data) => {
                self.framed.send(&data).await?;
                self.logger
                    .transfer(self.id, Direction::Download, &self.cwd.join(name), data.len() as u64);
                Ok(Ok(()))
            }
            Err(e) => {
                // The client is waiting for exactly one payload either way
                self.framed.send(MISSING_FILE_TEXT.as_bytes()).await?;
                Ok(Err(e))
            }
        }
    }

    async fn send_snapshot(&mut self) -> Result<()> {
        let text = snapshot::capture(self.fs.as_ref(), &self.cwd);
        self.framed.send(text.as_bytes()).await
    }
}
