//! Session audit trail. Console diagnostics go through `tracing`; this is the
//! optional append-only record enabled with `--log-file`.

use anyhow::Result;
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upload,
    Download,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Upload => "UL",
            Direction::Download => "DL",
        }
    }
}

pub trait Logger: Send + Sync {
    fn connect(&self, _session: Uuid, _peer: SocketAddr) {}
    fn command(&self, _session: Uuid, _line: &str) {}
    fn fs_error(&self, _session: Uuid, _command: &str, _msg: &str) {}
    fn transfer(&self, _session: Uuid, _direction: Direction, _path: &Path, _bytes: u64) {}
    fn disconnect(&self, _session: Uuid, _reason: &str) {}
}

pub struct NoopLogger;
impl Logger for NoopLogger {}

pub struct TextLogger {
    file: Mutex<File>,
}

impl TextLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(f),
        })
    }

    fn line(&self, s: &str) {
        if let Ok(mut f) = self.file.lock() {
            let _ = writeln!(f, "[{}] {}", Utc::now().to_rfc3339(), s);
        }
    }
}

impl Logger for TextLogger {
    fn connect(&self, session: Uuid, peer: SocketAddr) {
        self.line(&format!("CONNECT session={session} peer={peer}"));
    }
    fn command(&self, session: Uuid, line: &str) {
        self.line(&format!("CMD session={session} line={line:?}"));
    }
    fn fs_error(&self, session: Uuid, command: &str, msg: &str) {
        self.line(&format!("ERROR session={session} cmd={command:?} msg={msg}"));
    }
    fn transfer(&self, session: Uuid, direction: Direction, path: &Path, bytes: u64) {
        self.line(&format!(
            "{} session={} path={} bytes={}",
            direction.as_str(),
            session,
            path.display(),
            bytes
        ));
    }
    fn disconnect(&self, session: Uuid, reason: &str) {
        self.line(&format!("BYE session={session} reason={reason}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_logger_appends_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("logs/audit.log");
        let id = Uuid::new_v4();
        {
            let log = TextLogger::new(&path).unwrap();
            log.connect(id, "127.0.0.1:5000".parse().unwrap());
            log.command(id, "mkdir sub");
            log.transfer(id, Direction::Upload, Path::new("/srv/a.bin"), 42);
            log.disconnect(id, "client exit");
        }
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("CONNECT") && lines[0].contains("127.0.0.1:5000"));
        assert!(lines[1].contains("line=\"mkdir sub\""));
        assert!(lines[2].contains("UL") && lines[2].contains("bytes=42"));
        assert!(lines[3].contains(&format!("BYE session={id}")));
        assert!(lines.iter().all(|l| l.starts_with('[')));
    }

    #[test]
    fn test_noop_logger_is_silent() {
        let log: Box<dyn Logger> = Box::new(NoopLogger);
        log.command(Uuid::new_v4(), "cd ..");
    }
}
