//! Command lines exchanged between client and server.
//!
//! The command word is matched as a plain prefix of the line, so `cdfoo`
//! is a `cd` and `rmdir x` is an `rm`. The argument is every whitespace
//! separated token after the first, joined with no separator: `ul my file`
//! names `myfile`.

use std::fmt;

use crate::protocol::command::{CD, DL, EXIT, MKDIR, RM, UL};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Cd(String),
    Mkdir(String),
    Rm(String),
    Upload(String),
    Download(String),
    /// Anything else. The server ends the session on it.
    Disconnect,
}

impl Command {
    /// Server-side parse. Never fails: unknown input means disconnect.
    pub fn parse(line: &str) -> Self {
        let arg = || argument(line);
        if line.starts_with(CD) {
            Command::Cd(arg())
        } else if line.starts_with(MKDIR) {
            Command::Mkdir(arg())
        } else if line.starts_with(RM) {
            Command::Rm(arg())
        } else if line.starts_with(UL) {
            Command::Upload(arg())
        } else if line.starts_with(DL) {
            Command::Download(arg())
        } else {
            Command::Disconnect
        }
    }

    pub fn argument(&self) -> Option<&str> {
        match self {
            Command::Cd(a)
            | Command::Mkdir(a)
            | Command::Rm(a)
            | Command::Upload(a)
            | Command::Download(a) => Some(a),
            Command::Disconnect => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Cd(_) => CD,
            Command::Mkdir(_) => MKDIR,
            Command::Rm(_) => RM,
            Command::Upload(_) => UL,
            Command::Download(_) => DL,
            Command::Disconnect => EXIT,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.argument() {
            Some(arg) => write!(f, "{} {}", self.name(), arg),
            None => f.write_str(self.name()),
        }
    }
}

/// Join all tokens after the first without spaces.
pub fn argument(line: &str) -> String {
    line.split_whitespace().skip(1).collect()
}

/// What the client does with a line the user typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// Send the line as typed; the server re-parses it.
    Send(Command),
    Exit,
    Invalid,
}

impl UserInput {
    pub fn parse(line: &str) -> Self {
        match Command::parse(line) {
            Command::Disconnect if line.starts_with(EXIT) => UserInput::Exit,
            Command::Disconnect => UserInput::Invalid,
            command => UserInput::Send(command),
        }
    }
}
