//! Endpoint parsing for `remfs://host[:port]` and bare `host[:port]`

use std::fmt;

use crate::protocol::DEFAULT_PORT;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

pub fn parse_endpoint(s: &str) -> Option<Endpoint> {
    let s_trim = s.trim();
    let lower = s_trim.to_ascii_lowercase();
    let mut rest = if lower.starts_with("remfs:") {
        &s_trim["remfs:".len()..]
    } else if lower.contains("://") {
        return None;
    } else {
        s_trim
    };
    if let Some(r) = rest.strip_prefix("//") {
        rest = r;
    }
    let hp = rest.trim_end_matches('/');
    if hp.is_empty() {
        return None;
    }
    let (host, port) = match hp.rsplit_once(':') {
        Some((h, pr)) => (h.to_string(), pr.parse().ok()?),
        None => (hp.to_string(), DEFAULT_PORT),
    };
    if host.is_empty() {
        return None;
    }
    Some(Endpoint { host, port })
}
