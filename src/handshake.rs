//! Delimiter negotiation. The token is the only unframed message in a session.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::Result;
use crate::framing::Delimiter;
use crate::protocol::TOKEN_LEN;

/// Server side: pick a token and send it raw as the first bytes.
pub async fn offer<W>(writer: &mut W) -> Result<Delimiter>
where
    W: AsyncWrite + Unpin,
{
    let delimiter = Delimiter::generate();
    writer.write_all(delimiter.as_bytes()).await?;
    writer.flush().await?;
    Ok(delimiter)
}

/// Client side: read exactly the token bytes, so the framed snapshot that
/// follows is never swallowed along with it.
pub async fn accept<R>(reader: &mut R) -> Result<Delimiter>
where
    R: AsyncRead + Unpin,
{
    let mut raw = [0u8; TOKEN_LEN];
    reader.read_exact(&mut raw).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => crate::error::ProtocolError::Disconnected,
        _ => e.into(),
    })?;
    Delimiter::parse(&raw)
}
