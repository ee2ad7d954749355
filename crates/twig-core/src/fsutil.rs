//! Filesystem helpers for the working tree and crash-safe state writes.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::error::{TwigError, TwigResult};

/// Write data to a file atomically using temp-file-then-rename.
///
/// On POSIX, `rename()` within the same filesystem is atomic: either the
/// old file or the new file is visible, never a partial write. The temp
/// file is fsynced before renaming.
pub fn atomic_write(path: &Path, data: &[u8]) -> TwigResult<()> {
    let tmp = path.with_extension("tmp");
    let mut file = File::create(&tmp)?;
    file.write_all(data)?;
    file.sync_data()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Resolve a working-tree relative path, rejecting anything that escapes `root`.
pub fn resolve_in(root: &Path, rel_path: &str) -> TwigResult<PathBuf> {
    if rel_path.is_empty() || rel_path.starts_with('/') || rel_path.starts_with('\\') {
        return Err(TwigError::PathTraversal(rel_path.to_string()));
    }
    for component in Path::new(rel_path).components() {
        if !matches!(component, Component::Normal(_) | Component::CurDir) {
            return Err(TwigError::PathTraversal(rel_path.to_string()));
        }
    }
    Ok(root.join(rel_path))
}

/// Read a working file's raw bytes, or `None` if it does not exist.
pub fn read_bytes(path: &Path) -> TwigResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Read a working file as text, or `None` if it does not exist.
///
/// Content that is not valid UTF-8 is rejected, never rewritten.
pub fn read_text(path: &Path) -> TwigResult<Option<String>> {
    match read_bytes(path)? {
        Some(bytes) => String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| TwigError::NotText(path.display().to_string())),
        None => Ok(None),
    }
}

/// Write a working file, creating parent directories as needed.
pub fn write_text(path: &Path, content: &str) -> TwigResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

/// Delete a working file if present, pruning directories it leaves empty.
pub fn remove_file(path: &Path, stop_at: &Path) -> TwigResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            if let Some(parent) = path.parent() {
                if let Err(e) = remove_empty_dirs(parent, stop_at) {
                    warn!(dir = %parent.display(), error = %e, "could not prune empty directories");
                }
            }
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn remove_empty_dirs(dir: &Path, stop_at: &Path) -> io::Result<()> {
    let mut current = dir.to_path_buf();
    while current != stop_at && current.starts_with(stop_at) {
        if fs::read_dir(&current)?.next().is_some() {
            break;
        }
        fs::remove_dir(&current)?;
        match current.parent() {
            Some(p) => current = p.to_path_buf(),
            None => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_replaces() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        atomic_write(&path, b"one").unwrap();
        atomic_write(&path, b"two").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"two");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let root = Path::new("/repo");
        assert!(resolve_in(root, "../etc/passwd").is_err());
        assert!(resolve_in(root, "/etc/passwd").is_err());
        assert!(resolve_in(root, "a/../../b").is_err());
        assert!(resolve_in(root, "").is_err());
        assert_eq!(resolve_in(root, "src/a.txt").unwrap(), root.join("src/a.txt"));
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = tempdir().unwrap();
        assert_eq!(read_text(&dir.path().join("nope")).unwrap(), None);
        assert_eq!(read_bytes(&dir.path().join("nope")).unwrap(), None);
    }

    #[test]
    fn test_read_text_rejects_invalid_utf8() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bin.dat");
        fs::write(&path, [255u8, 254, 97]).unwrap();
        assert!(matches!(read_text(&path), Err(TwigError::NotText(_))));
        assert_eq!(read_bytes(&path).unwrap(), Some(vec![255, 254, 97]));
        // The file itself is left alone.
        assert_eq!(fs::read(&path).unwrap(), vec![255, 254, 97]);
    }

    #[test]
    fn test_remove_prunes_empty_dirs() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a/b/c.txt");
        write_text(&nested, "x").unwrap();
        assert!(remove_file(&nested, dir.path()).unwrap());
        assert!(!dir.path().join("a").exists());
        assert!(dir.path().exists());
        assert!(!remove_file(&nested, dir.path()).unwrap());
    }
}
