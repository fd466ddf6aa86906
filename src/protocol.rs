//! Shared protocol constants for the remfs delimiter-framed transport

// Delimiter token shape: '<' + 8 alphanumerics + '>'
pub const TOKEN_LEN: usize = 10;
pub const TOKEN_BODY_LEN: usize = 8;
pub const TOKEN_OPEN: u8 = b'<';
pub const TOKEN_CLOSE: u8 = b'>';

// Size of each read() while scanning for the delimiter
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

pub const DEFAULT_PORT: u16 = 65431;
pub const DEFAULT_BIND: &str = "127.0.0.1:65431";

/// Framed in place of file bytes when a `dl` target is missing.
pub const MISSING_FILE_TEXT: &str = "The given file does not exists in server.";

/// Disconnect directive sent by the client on `exit`. The server treats any
/// unrecognized command the same way.
pub const DISCONNECT: &str = "Exit";

// Command words, matched by prefix in this order
pub mod command {
    pub const CD: &str = "cd";
    pub const MKDIR: &str = "mkdir";
    pub const RM: &str = "rm";
    pub const UL: &str = "ul";
    pub const DL: &str = "dl";
    pub const EXIT: &str = "exit";
}

// Directory snapshot layout
pub mod snapshot {
    pub const HEADER_PREFIX: &str = "Current Directory: ";
    pub const HEADER_SUFFIX: &str = ":\n|";
    pub const ENTRY_PREFIX: &str = "\n-- ";
}
