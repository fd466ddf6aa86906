use std::path::PathBuf;
use thiserror::Error;

/// Transport and handshake failures. All of them end the session.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("peer disconnected before the message delimiter arrived")]
    Disconnected,

    #[error("invalid delimiter token: {0:?}")]
    InvalidToken(String),

    #[error("read buffer of {0} bytes cannot hold the {} byte delimiter", crate::protocol::TOKEN_LEN)]
    BufferTooSmall(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of a single filesystem command. Never fatal to the session.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("no such file or directory: {}", .0.display())]
    NotFound(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("refusing to remove {}: it contains the current directory", .0.display())]
    InUse(PathBuf),

    #[error("path {} escapes root {}", .path.display(), .root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FsError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
