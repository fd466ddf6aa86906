//! remfs: a minimal remote filesystem shell.
//!
//! A client navigates and transfers files on a server over one TCP
//! connection per session. Messages are terminated by a random 10-byte token
//! the server picks at connect time; after every command the server answers
//! with a snapshot of its current directory.

pub mod cli;
pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod framing;
pub mod fs;
pub mod handshake;
pub mod logger;
pub mod protocol;
pub mod server;
pub mod session;
pub mod snapshot;
pub mod url;

pub use client::{Client, ClientConfig, Reply};
pub use config::ServerConfig;
pub use error::{FsError, ProtocolError};
pub use framing::{Delimiter, Framed, ScanMode};
