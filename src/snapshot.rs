//! Directory snapshot text sent after every command.
//!
//! ```text
//! Current Directory: /srv/data:
//! |
//! -- docs
//! -- src
//! -- notes.txt
//! ```
//!
//! An empty group still contributes one bare `-- ` line.

use std::path::Path;

use crate::fs::{DirEntries, Filesystem};
use crate::protocol::snapshot::{ENTRY_PREFIX, HEADER_PREFIX, HEADER_SUFFIX};

pub fn render(dir: &Path, entries: &DirEntries) -> String {
    let mut out = format!("{HEADER_PREFIX}{}{HEADER_SUFFIX}", dir.display());
    for group in [&entries.directories, &entries.files] {
        out.push_str(ENTRY_PREFIX);
        out.push_str(&group.join(ENTRY_PREFIX));
    }
    out
}

/// Snapshot of `dir`, or of an empty listing when `dir` can't be read (for
/// example after the session's directory was removed underneath it).
pub fn capture(fs: &dyn Filesystem, dir: &Path) -> String {
    let entries = match fs.list_entries(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "directory listing failed");
            DirEntries::default()
        }
    };
    render(dir, &entries)
}

/// Pull the child names back out of a snapshot. Returns `None` if `text` does
/// not start with a snapshot header.
pub fn entry_names(text: &str) -> Option<Vec<&str>> {
    let body = text.strip_prefix(HEADER_PREFIX)?;
    let (_, listing) = body.split_once(HEADER_SUFFIX)?;
    Some(
        listing
            .split(ENTRY_PREFIX)
            .filter(|name| !name.is_empty())
            .collect(),
    )
}
