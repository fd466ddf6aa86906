//! Client side of a session: one method per command, each returning what the
//! server sent back.

use std::path::{Path, PathBuf};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

use crate::command::{Command, UserInput};
use crate::error::{ProtocolError, Result};
use crate::framing::{Delimiter, Framed, ScanMode};
use crate::handshake;
use crate::protocol::{DEFAULT_BUFFER_SIZE, DISCONNECT, TOKEN_LEN};
use crate::url::Endpoint;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub local_dir: PathBuf,
    pub buffer_size: usize,
    pub scan_mode: ScanMode,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            local_dir: PathBuf::from("."),
            buffer_size: DEFAULT_BUFFER_SIZE,
            scan_mode: ScanMode::default(),
        }
    }
}

impl ClientConfig {
    /// Same floor the server applies: chunk-tail scanning never matches a
    /// delimiter longer than one read.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size < TOKEN_LEN {
            return Err(ProtocolError::BufferTooSmall(self.buffer_size));
        }
        Ok(())
    }
}

/// Outcome of one line of user input.
#[derive(Debug)]
pub enum Reply {
    /// Server directory state after the command.
    Snapshot(String),
    /// `dl` finished. `bytes` were received and written to `path` unless
    /// `saved` holds the local write error.
    Download {
        path: PathBuf,
        bytes: usize,
        saved: std::io::Result<()>,
        snapshot: String,
    },
    /// Rejected locally; nothing went over the wire.
    Rejected(String),
    /// Disconnect sent; the connection is closed.
    Closed,
}

pub struct Client<S = TcpStream> {
    framed: Framed<S>,
    local_dir: PathBuf,
    closed: bool,
}

impl Client<TcpStream> {
    /// Connect and handshake. Returns the client and the initial snapshot.
    pub async fn connect(endpoint: &Endpoint, cfg: &ClientConfig) -> Result<(Self, String)> {
        cfg.validate()?;
        let stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port)).await?;
        let _ = stream.set_nodelay(true);
        Self::handshake(stream, cfg).await
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub async fn handshake(mut stream: S, cfg: &ClientConfig) -> Result<(Self, String)> {
        cfg.validate()?;
        let delimiter = handshake::accept(&mut stream).await?;
        debug!(token = %delimiter, "handshake done");
        let framed = Framed::new(stream, delimiter)
            .with_buffer_size(cfg.buffer_size)
            .with_scan_mode(cfg.scan_mode);
        let mut client = Self {
            framed,
            local_dir: cfg.local_dir.clone(),
            closed: false,
        };
        let initial = client.framed.receive_text().await?;
        Ok((client, initial))
    }

    pub fn delimiter(&self) -> &Delimiter {
        self.framed.delimiter()
    }

    pub fn local_dir(&self) -> &Path {
        &self.local_dir
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Run one line exactly as typed at the prompt.
    pub async fn execute(&mut self, line: &str) -> Result<Reply> {
        match UserInput::parse(line) {
            UserInput::Invalid => Ok(Reply::Rejected(format!("Invalid Command: {line}"))),
            UserInput::Exit => {
                self.exit().await?;
                Ok(Reply::Closed)
            }
            UserInput::Send(Command::Upload(name)) => self.upload(line, &name).await,
            UserInput::Send(Command::Download(name)) => self.download(line, &name).await,
            UserInput::Send(_) => self.simple(line).await,
        }
    }

    /// `cd`, `mkdir` and `rm`: one line out, one snapshot back.
    async fn simple(&mut self, line: &str) -> Result<Reply> {
        self.framed.send(line.as_bytes()).await?;
        Ok(Reply::Snapshot(self.framed.receive_text().await?))
    }

    async fn upload(&mut self, line: &str, name: &str) -> Result<Reply> {
        let path = self.local_dir.join(name);
        if !path.is_file() {
            return Ok(Reply::Rejected("Given file does not exists.".to_string()));
        }
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) => return Ok(Reply::Rejected(format!("cannot read {}: {e}", path.display()))),
        };
        self.framed.send(line.as_bytes()).await?;
        self.framed.send(&data).await?;
        debug!(path = %path.display(), bytes = data.len(), "uploaded");
        Ok(Reply::Snapshot(self.framed.receive_text().await?))
    }

    /// Whatever the server sends (file bytes or its missing-file text) is
    /// written to the local file.
    async fn download(&mut self, line: &str, name: &str) -> Result<Reply> {
        self.framed.send(line.as_bytes()).await?;
        let data = self.framed.receive().await?;
        let path = self.local_dir.join(name);
        let saved = tokio::fs::write(&path, &data).await;
        let snapshot = self.framed.receive_text().await?;
        Ok(Reply::Download {
            path,
            bytes: data.len(),
            saved,
            snapshot,
        })
    }

    /// Send the disconnect directive and close without waiting for a reply.
    pub async fn exit(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.framed.send(DISCONNECT.as_bytes()).await?;
        self.framed.shutdown().await
    }
}
