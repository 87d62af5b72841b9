//! Filesystem helpers shared by buffer installation and target state.
use std::path::{Path, PathBuf};

use crate::error::FileError;

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<(), FileError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| FileError::io(parent, e))?;
    }
    Ok(())
}

/// Remove an existing file or symlink at `path`, including broken symlinks.
///
/// Does nothing if `path` does not exist.
///
/// # Errors
///
/// Returns an error if the path exists but cannot be removed.
pub fn remove_existing(path: &Path) -> Result<(), FileError> {
    if path.symlink_metadata().is_ok() {
        std::fs::remove_file(path).map_err(|e| FileError::io(path, e))?;
    }
    Ok(())
}

/// `true` if something (file, directory, or possibly broken symlink) is at `path`.
#[must_use]
pub fn entry_exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Sibling path used to stage a write before renaming it over `path`.
///
/// Staying in the same directory keeps the final rename on one filesystem.
#[must_use]
pub fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "strata".to_string(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.strata-tmp"))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ensure_parent_dir_creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("file.txt");
        ensure_parent_dir(&nested).unwrap();
        assert!(dir.path().join("a").join("b").is_dir());
    }

    #[test]
    fn remove_existing_removes_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("target");
        std::fs::write(&file, "content").unwrap();
        remove_existing(&file).unwrap();
        assert!(!entry_exists(&file));
    }

    #[test]
    fn remove_existing_noop_when_path_absent() {
        let dir = tempfile::tempdir().unwrap();
        remove_existing(&dir.path().join("nonexistent")).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn remove_existing_removes_broken_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink("/nonexistent/target", &link).unwrap();
        assert!(entry_exists(&link));
        assert!(!link.exists());
        remove_existing(&link).unwrap();
        assert!(!entry_exists(&link));
    }

    #[test]
    fn staging_path_is_a_hidden_sibling() {
        let staged = staging_path(Path::new("/etc/ssh/sshd_config"));
        assert_eq!(staged, PathBuf::from("/etc/ssh/.sshd_config.strata-tmp"));
    }
}
