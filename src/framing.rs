//! Delimiter framing shared by the server session and the client.
//!
//! A message on the wire is `payload || delimiter`, where the delimiter is the
//! 10-byte token negotiated at connect time. There is no length prefix and no
//! escaping, so a payload that contains the token is cut short at it.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, Result};
use crate::protocol::{DEFAULT_BUFFER_SIZE, TOKEN_BODY_LEN, TOKEN_CLOSE, TOKEN_LEN, TOKEN_OPEN};

/// Per-session end-of-message token, e.g. `<KfOVnVMV>`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Delimiter([u8; TOKEN_LEN]);

impl Delimiter {
    /// Fresh token with 8 characters drawn uniformly from `[A-Za-z0-9]`.
    pub fn generate() -> Self {
        let mut token = [0u8; TOKEN_LEN];
        token[0] = TOKEN_OPEN;
        token[TOKEN_LEN - 1] = TOKEN_CLOSE;
        let mut rng = rand::thread_rng();
        for slot in &mut token[1..=TOKEN_BODY_LEN] {
            *slot = rng.sample(Alphanumeric);
        }
        Delimiter(token)
    }

    /// Validate a token received from the peer.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let well_formed = raw.len() == TOKEN_LEN
            && raw[0] == TOKEN_OPEN
            && raw[TOKEN_LEN - 1] == TOKEN_CLOSE
            && raw[1..=TOKEN_BODY_LEN].iter().all(u8::is_ascii_alphanumeric);
        if !well_formed {
            return Err(ProtocolError::InvalidToken(
                String::from_utf8_lossy(raw).into_owned(),
            ));
        }
        let mut token = [0u8; TOKEN_LEN];
        token.copy_from_slice(raw);
        Ok(Delimiter(token))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII ever lands in the token
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Delimiter({})", self.as_str())
    }
}

/// How the receiver decides a message is complete.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ScanMode {
    /// Legacy receive rule, as used by existing peers of this wire format.
    /// Only the tail of the most recent read is compared with the delimiter.
    /// A delimiter split across two reads is missed, and bytes of a following
    /// message that arrive in the same read corrupt the current one.
    ChunkTail,
    /// The accumulated buffer is searched and any bytes after the delimiter
    /// are kept for the next receive. Same bytes on the wire as `ChunkTail`.
    #[default]
    Buffered,
}

/// Write `payload || delimiter` in one go.
pub async fn send_message<W>(writer: &mut W, payload: &[u8], delimiter: &Delimiter) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut framed = Vec::with_capacity(payload.len() + TOKEN_LEN);
    framed.extend_from_slice(payload);
    framed.extend_from_slice(delimiter.as_bytes());
    writer.write_all(&framed).await?;
    writer.flush().await?;
    Ok(())
}

/// Read chunks of up to `buffer_size` bytes until one ends with the delimiter.
///
/// Only the just-read chunk's tail is checked, never the accumulated buffer.
/// Messages shorter than `buffer_size` that arrive alone are always found.
pub async fn receive_message<R>(
    reader: &mut R,
    buffer_size: usize,
    delimiter: &Delimiter,
) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let token = delimiter.as_bytes();
    let mut message = Vec::new();
    let mut chunk = vec![0u8; buffer_size.max(1)];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(ProtocolError::Disconnected);
        }
        let packet = &chunk[..n];
        if packet.ends_with(token) {
            message.extend_from_slice(&packet[..n - token.len()]);
            return Ok(message);
        }
        message.extend_from_slice(packet);
    }
}

fn find_token(haystack: &[u8], token: &[u8]) -> Option<usize> {
    haystack.windows(token.len()).position(|w| w == token)
}

/// A stream plus the negotiated delimiter. Both the server session and the
/// client talk through one of these after the handshake.
pub struct Framed<S> {
    stream: S,
    delimiter: Delimiter,
    buffer_size: usize,
    mode: ScanMode,
    pending: Vec<u8>,
}

impl<S> Framed<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, delimiter: Delimiter) -> Self {
        Self {
            stream,
            delimiter,
            buffer_size: DEFAULT_BUFFER_SIZE,
            mode: ScanMode::default(),
            pending: Vec::new(),
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn with_scan_mode(mut self, mode: ScanMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn delimiter(&self) -> &Delimiter {
        &self.delimiter
    }

    pub async fn send(&mut self, payload: &[u8]) -> Result<()> {
        send_message(&mut self.stream, payload, &self.delimiter).await
    }

    pub async fn receive(&mut self) -> Result<Vec<u8>> {
        match self.mode {
            ScanMode::ChunkTail => {
                receive_message(&mut self.stream, self.buffer_size, &self.delimiter).await
            }
            ScanMode::Buffered => self.receive_buffered().await,
        }
    }

    /// Receive one message and decode it as text, replacing invalid UTF-8.
    pub async fn receive_text(&mut self) -> Result<String> {
        let raw = self.receive().await?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    async fn receive_buffered(&mut self) -> Result<Vec<u8>> {
        let token_len = self.delimiter.as_bytes().len();
        let mut scan_from = 0;
        let mut chunk = vec![0u8; self.buffer_size];
        loop {
            if let Some(pos) = find_token(&self.pending[scan_from..], self.delimiter.as_bytes()) {
                let end = scan_from + pos;
                let rest = self.pending.split_off(end + token_len);
                self.pending.truncate(end);
                return Ok(std::mem::replace(&mut self.pending, rest));
            }
            // A token may straddle the old tail and the next chunk
            scan_from = self.pending.len().saturating_sub(token_len - 1);
            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(ProtocolError::Disconnected);
            }
            self.pending.extend_from_slice(&chunk[..n]);
        }
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}
