//! Local directory bookkeeping for artifact transfer
//!
//! Directories are not locked: two callers resetting the same path can
//! interleave destructively.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::Result;

/// Create `path` and any missing parents.
///
/// When the directory already exists and `clear_if_exists` is set, it is
/// removed recursively first so the result is empty.
///
/// # Errors
///
/// Returns error if the directory cannot be removed or created
pub fn ensure_directory(path: impl AsRef<Path>, clear_if_exists: bool) -> Result<PathBuf> {
    let path = path.as_ref();

    if clear_if_exists && path.exists() {
        debug!(path = %path.display(), "clearing directory");
        fs::remove_dir_all(path)?;
    }
    fs::create_dir_all(path)?;

    Ok(path.to_path_buf())
}

/// Best-effort recursive removal of `path`.
///
/// A missing directory is not an error. Any other failure is logged and
/// swallowed.
pub fn remove_directory(path: impl AsRef<Path>) {
    let path = path.as_ref();
    match fs::remove_dir_all(path) {
        Ok(()) => debug!(path = %path.display(), "removed directory"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove directory"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_directory_creates_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b").join("c");

        let created = ensure_directory(&nested, true).unwrap();
        assert_eq!(created, nested);
        assert!(nested.is_dir());
    }

    #[test]
    fn test_ensure_directory_clears_existing_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("run");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("stale.csv"), "x").unwrap();

        ensure_directory(&dir, true).unwrap();
        assert!(dir.is_dir());
        assert!(!dir.join("stale.csv").exists());
    }

    #[test]
    fn test_ensure_directory_keeps_contents_when_not_clearing() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("run");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("keep.csv"), "x").unwrap();

        ensure_directory(&dir, false).unwrap();
        assert!(dir.join("keep.csv").exists());
    }

    #[test]
    fn test_remove_directory_is_best_effort() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("gone");
        fs::create_dir_all(dir.join("inner")).unwrap();

        remove_directory(&dir);
        assert!(!dir.exists());

        // Second removal hits NotFound and stays silent
        remove_directory(&dir);
    }
}
