//! Filesystem provider used by server sessions.
//!
//! Every operation takes the session's current directory explicitly; nothing
//! here touches the process-wide working directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::error::FsError;

pub type FsResult<T> = std::result::Result<T, FsError>;

/// Immediate children of a directory, split by kind and sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirEntries {
    pub directories: Vec<String>,
    pub files: Vec<String>,
}

pub trait Filesystem: Send + Sync {
    fn list_entries(&self, dir: &Path) -> FsResult<DirEntries>;
    /// Resolve `target` against `cwd` and return the new absolute directory.
    fn change_directory(&self, cwd: &Path, target: &str) -> FsResult<PathBuf>;
    fn create_directory(&self, cwd: &Path, name: &str) -> FsResult<()>;
    fn remove(&self, cwd: &Path, name: &str) -> FsResult<()>;
    fn read_file(&self, cwd: &Path, name: &str) -> FsResult<Vec<u8>>;
    fn write_file(&self, cwd: &Path, name: &str, data: &[u8]) -> FsResult<()>;
}

/// The host filesystem, optionally confined to a root directory.
#[derive(Debug, Clone, Default)]
pub struct LocalFs {
    root: Option<PathBuf>,
}

impl LocalFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any path that resolves outside `root`. `root` should already be
    /// canonical.
    pub fn confined(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    fn check_root(&self, path: &Path) -> FsResult<()> {
        match &self.root {
            Some(root) if !path.starts_with(root) => Err(FsError::OutsideRoot {
                path: path.to_path_buf(),
                root: root.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Join `name` onto `cwd` and fold `.`/`..` lexically. Absolute names
    /// replace `cwd`. When confined, the root check runs on the physical
    /// location so symlinks cannot lead outside.
    fn resolve(&self, cwd: &Path, name: &str) -> FsResult<PathBuf> {
        let mut out = PathBuf::new();
        for component in cwd.join(name).components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    out.pop();
                }
                Component::Normal(s) => out.push(s),
                Component::RootDir | Component::Prefix(_) => out.push(component.as_os_str()),
            }
        }
        if self.root.is_some() {
            self.check_root(&physical(&out)?)?;
        }
        Ok(out)
    }
}

/// Canonicalize the deepest part of `path` that exists and re-append the
/// missing tail. A dangling symlink has no physical location and is an error.
fn physical(path: &Path) -> FsResult<PathBuf> {
    let mut base = path.to_path_buf();
    let mut tail = Vec::new();
    while fs::symlink_metadata(&base).is_err() {
        match base.file_name() {
            Some(name) => {
                tail.push(name.to_os_string());
                base.pop();
            }
            None => break,
        }
    }
    let mut out = base.canonicalize().map_err(|e| map_io(&base, e))?;
    out.extend(tail.iter().rev());
    Ok(out)
}

fn map_io(path: &Path, err: std::io::Error) -> FsError {
    match err.kind() {
        ErrorKind::NotFound => FsError::NotFound(path.to_path_buf()),
        ErrorKind::AlreadyExists => FsError::AlreadyExists(path.to_path_buf()),
        _ => FsError::io(path, err),
    }
}

impl Filesystem for LocalFs {
    fn list_entries(&self, dir: &Path) -> FsResult<DirEntries> {
        let mut entries = DirEntries::default();
        for entry in fs::read_dir(dir).map_err(|e| map_io(dir, e))? {
            let entry = entry.map_err(|e| map_io(dir, e))?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            // Follows symlinks; dangling links land in neither group
            if path.is_dir() {
                entries.directories.push(name);
            } else if path.is_file() {
                entries.files.push(name);
            }
        }
        entries.directories.sort();
        entries.files.sort();
        Ok(entries)
    }

    fn change_directory(&self, cwd: &Path, target: &str) -> FsResult<PathBuf> {
        let joined = cwd.join(target);
        let canonical = joined.canonicalize().map_err(|e| map_io(&joined, e))?;
        if !canonical.is_dir() {
            return Err(FsError::NotADirectory(canonical));
        }
        self.check_root(&canonical)?;
        Ok(canonical)
    }

    fn create_directory(&self, cwd: &Path, name: &str) -> FsResult<()> {
        let path = self.resolve(cwd, name)?;
        if path.exists() {
            return Err(FsError::AlreadyExists(path));
        }
        fs::create_dir_all(&path).map_err(|e| map_io(&path, e))
    }

    fn remove(&self, cwd: &Path, name: &str) -> FsResult<()> {
        let path = self.resolve(cwd, name)?;
        if cwd.starts_with(&path) {
            return Err(FsError::InUse(path));
        }
        let meta = fs::symlink_metadata(&path).map_err(|e| map_io(&path, e))?;
        if meta.is_dir() {
            fs::remove_dir_all(&path).map_err(|e| map_io(&path, e))
        } else {
            fs::remove_file(&path).map_err(|e| map_io(&path, e))
        }
    }

    fn read_file(&self, cwd: &Path, name: &str) -> FsResult<Vec<u8>> {
        let path = self.resolve(cwd, name)?;
        if !path.is_file() {
            return Err(FsError::NotFound(path));
        }
        fs::read(&path).map_err(|e| map_io(&path, e))
    }

    fn write_file(&self, cwd: &Path, name: &str, data: &[u8]) -> FsResult<()> {
        let path = self.resolve(cwd, name)?;
        fs::write(&path, data).map_err(|e| map_io(&path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scratch() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        (tmp, root)
    }

    #[test]
    fn test_list_entries_splits_and_sorts() {
        let (_tmp, root) = scratch();
        fs::create_dir(root.join("zeta")).unwrap();
        fs::create_dir(root.join("alpha")).unwrap();
        fs::write(root.join("b.txt"), "b").unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();

        let entries = LocalFs::new().list_entries(&root).unwrap();
        assert_eq!(entries.directories, vec!["alpha", "zeta"]);
        assert_eq!(entries.files, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_change_directory_into_child_and_parent() {
        let (_tmp, root) = scratch();
        fs::create_dir(root.join("sub")).unwrap();
        let fsys = LocalFs::new();

        let sub = fsys.change_directory(&root, "sub").unwrap();
        assert_eq!(sub, root.join("sub"));
        let back = fsys.change_directory(&sub, "..").unwrap();
        assert_eq!(back, root);
    }

    #[test]
    fn test_change_directory_errors() {
        let (_tmp, root) = scratch();
        fs::write(root.join("file.txt"), "x").unwrap();
        let fsys = LocalFs::new();

        assert!(matches!(
            fsys.change_directory(&root, "missing"),
            Err(FsError::NotFound(_))
        ));
        assert!(matches!(
            fsys.change_directory(&root, "file.txt"),
            Err(FsError::NotADirectory(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_change_directory_parent_of_root_stays() {
        let fsys = LocalFs::new();
        let up = fsys.change_directory(Path::new("/"), "..").unwrap();
        assert_eq!(up, PathBuf::from("/"));
    }

    #[test]
    fn test_create_directory_nested() {
        let (_tmp, root) = scratch();
        let fsys = LocalFs::new();
        fsys.create_directory(&root, "a/b").unwrap();
        assert!(root.join("a").is_dir());
        assert!(root.join("a/b").is_dir());

        assert!(matches!(
            fsys.create_directory(&root, "a"),
            Err(FsError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_remove_file_and_tree() {
        let (_tmp, root) = scratch();
        fs::create_dir_all(root.join("tree/inner")).unwrap();
        fs::write(root.join("tree/inner/f"), "f").unwrap();
        fs::write(root.join("loose.txt"), "l").unwrap();
        let fsys = LocalFs::new();

        fsys.remove(&root, "loose.txt").unwrap();
        fsys.remove(&root, "tree").unwrap();
        assert!(!root.join("loose.txt").exists());
        assert!(!root.join("tree").exists());
        assert!(matches!(fsys.remove(&root, "tree"), Err(FsError::NotFound(_))));
    }

    #[test]
    fn test_remove_refuses_current_directory() {
        let (_tmp, root) = scratch();
        fs::create_dir(root.join("sub")).unwrap();
        let sub = root.join("sub");
        let fsys = LocalFs::new();

        assert!(matches!(fsys.remove(&sub, ""), Err(FsError::InUse(_))));
        assert!(matches!(fsys.remove(&sub, "."), Err(FsError::InUse(_))));
        assert!(matches!(fsys.remove(&sub, ".."), Err(FsError::InUse(_))));
        assert!(sub.is_dir());
    }

    #[test]
    fn test_read_and_write_file() {
        let (_tmp, root) = scratch();
        let fsys = LocalFs::new();
        let data: Vec<u8> = (0..=255u8).collect();

        fsys.write_file(&root, "blob.bin", &data).unwrap();
        assert_eq!(fsys.read_file(&root, "blob.bin").unwrap(), data);
        assert!(matches!(
            fsys.read_file(&root, "nope.bin"),
            Err(FsError::NotFound(_))
        ));
        fs::create_dir(root.join("dir")).unwrap();
        assert!(matches!(fsys.read_file(&root, "dir"), Err(FsError::NotFound(_))));
    }

    #[test]
    fn test_confined_rejects_escapes() {
        let (_tmp, base) = scratch();
        let root = base.join("jail");
        fs::create_dir(&root).unwrap();
        let fsys = LocalFs::confined(&root);

        assert!(matches!(
            fsys.change_directory(&root, ".."),
            Err(FsError::OutsideRoot { .. })
        ));
        assert!(matches!(
            fsys.create_directory(&root, "../escape"),
            Err(FsError::OutsideRoot { .. })
        ));
        assert!(matches!(
            fsys.write_file(&root, "/tmp/remfs-escape", b"x"),
            Err(FsError::OutsideRoot { .. })
        ));
        assert!(!base.join("escape").exists());

        fsys.create_directory(&root, "inside/deeper").unwrap();
        assert!(root.join("inside/deeper").is_dir());
        assert_eq!(fsys.root(), Some(root.as_path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_confined_rejects_symlink_escapes() {
        use std::os::unix::fs::symlink;

        let (_tmp, base) = scratch();
        let root = base.join("jail");
        let outside = base.join("outside");
        fs::create_dir(&root).unwrap();
        fs::create_dir(&outside).unwrap();
        fs::write(outside.join("secret.txt"), "s").unwrap();
        symlink(&outside, root.join("out")).unwrap();
        symlink(outside.join("secret.txt"), root.join("leak")).unwrap();
        let fsys = LocalFs::confined(&root);

        assert!(matches!(
            fsys.create_directory(&root, "out/new"),
            Err(FsError::OutsideRoot { .. })
        ));
        assert!(matches!(
            fsys.write_file(&root, "out/f.txt", b"x"),
            Err(FsError::OutsideRoot { .. })
        ));
        assert!(matches!(
            fsys.read_file(&root, "leak"),
            Err(FsError::OutsideRoot { .. })
        ));
        assert!(matches!(
            fsys.remove(&root, "out/secret.txt"),
            Err(FsError::OutsideRoot { .. })
        ));
        assert!(!outside.join("new").exists());
        assert!(!outside.join("f.txt").exists());
        assert!(outside.join("secret.txt").exists());

        // Links that stay inside the root still work
        fs::create_dir(root.join("real")).unwrap();
        symlink(root.join("real"), root.join("alias")).unwrap();
        fsys.create_directory(&root, "alias/x").unwrap();
        assert!(root.join("real/x").is_dir());
    }
}
