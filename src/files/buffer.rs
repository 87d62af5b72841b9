//! In-memory snapshot of a file's content or symlink target.
//!
//! A [`FileBuffer`] is immutable once constructed.  Pipeline stages take
//! ownership of the buffer they receive and hand back a new one, so no
//! buffer is ever observed by two stages.
use std::borrow::Cow;
use std::path::{Path, PathBuf};

use super::fs::{ensure_parent_dir, remove_existing, staging_path};
use crate::error::FileError;

/// Permission bits used for buffers that do not come from an existing file.
pub const DEFAULT_MODE: u32 = 0o644;

/// What a buffer holds: exactly one of raw bytes or a symlink target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contents {
    /// Regular file content.
    Regular(Vec<u8>),
    /// Symlink target, stored exactly as read (possibly relative).
    Symlink(PathBuf),
}

/// File ownership as numeric ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    /// Owning user id.
    pub uid: u32,
    /// Owning group id.
    pub gid: u32,
}

/// Immutable snapshot of a file or symlink plus its metadata.
#[derive(Debug, PartialEq, Eq)]
pub struct FileBuffer {
    path: PathBuf,
    base_path: PathBuf,
    mode: u32,
    owner: Option<Ownership>,
    contents: Contents,
}

impl FileBuffer {
    /// Snapshot whatever is at `path` without following a symlink there.
    ///
    /// A missing path yields the null baseline: empty regular content.
    /// `base_path` is the directory relative symlink targets resolve against.
    ///
    /// # Errors
    ///
    /// Returns [`FileError::Io`] if `path` exists but cannot be read, or is a
    /// directory.
    pub fn from_path(path: &Path, base_path: impl Into<PathBuf>) -> Result<Self, FileError> {
        let base_path = base_path.into();
        let meta = match std::fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::null(path, base_path));
            }
            Err(e) => return Err(FileError::io(path, e)),
        };

        let contents = if meta.file_type().is_symlink() {
            Contents::Symlink(std::fs::read_link(path).map_err(|e| FileError::io(path, e))?)
        } else if meta.is_dir() {
            return Err(FileError::io(
                path,
                std::io::Error::other("is a directory, expected a file"),
            ));
        } else {
            Contents::Regular(std::fs::read(path).map_err(|e| FileError::io(path, e))?)
        };

        let (mode, owner) = permissions_of(&meta);
        Ok(Self {
            path: path.to_path_buf(),
            base_path,
            mode,
            owner,
            contents,
        })
    }

    /// The null baseline for `path`: empty content, default mode, no owner.
    #[must_use]
    pub fn null(path: &Path, base_path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.to_path_buf(),
            base_path: base_path.into(),
            mode: DEFAULT_MODE,
            owner: None,
            contents: Contents::Regular(Vec::new()),
        }
    }

    /// Wrap explicit bytes (e.g. script output) produced by `source`.
    #[must_use]
    pub fn from_contents(
        contents: Vec<u8>,
        source: impl Into<PathBuf>,
        base_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            path: source.into(),
            base_path: base_path.into(),
            mode: DEFAULT_MODE,
            owner: None,
            contents: Contents::Regular(contents),
        }
    }

    /// Return this buffer with the given permission bits and owner.
    #[must_use]
    pub fn with_permissions(mut self, mode: u32, owner: Option<Ownership>) -> Self {
        self.mode = mode;
        self.owner = owner;
        self
    }

    /// Where the contents were read from or produced by.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory relative symlink targets resolve against.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Permission bits.
    #[must_use]
    pub const fn mode(&self) -> u32 {
        self.mode
    }

    /// Owner, when known.
    #[must_use]
    pub const fn owner(&self) -> Option<Ownership> {
        self.owner
    }

    /// The content-or-symlink payload.
    #[must_use]
    pub const fn contents(&self) -> &Contents {
        &self.contents
    }

    /// `true` if this buffer is an unresolved symlink.
    #[must_use]
    pub const fn is_symlink(&self) -> bool {
        matches!(self.contents, Contents::Symlink(_))
    }

    /// Regular content bytes, or `None` for a symlink.
    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.contents {
            Contents::Regular(bytes) => Some(bytes),
            Contents::Symlink(_) => None,
        }
    }

    /// Bytes shown when diffing this buffer: file content, or the link
    /// target text for a symlink.
    #[must_use]
    pub fn diff_bytes(&self) -> Cow<'_, [u8]> {
        match &self.contents {
            Contents::Regular(bytes) => Cow::Borrowed(bytes),
            Contents::Symlink(target) => {
                let mut text = target.as_os_str().as_encoded_bytes().to_vec();
                text.push(b'\n');
                Cow::Owned(text)
            }
        }
    }

    /// `true` if installing `self` over `other` would change nothing:
    /// same payload, and for regular files the same permission bits.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.contents == other.contents && (self.is_symlink() || self.mode == other.mode)
    }

    /// Follow a symlink chain until regular content is reached.
    ///
    /// The first link target resolves against [`base_path`](Self::base_path);
    /// later hops resolve against the directory of the link being followed.
    /// Every buffer in the chain inherits `base_path`.  A regular buffer is
    /// returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`FileError::DanglingSymlink`] when a link target does not
    /// exist or the chain is longer than `max_hops`, and [`FileError::Io`]
    /// when a link along the way cannot be read.
    pub fn resolve_symlink(self, max_hops: usize) -> Result<Self, FileError> {
        let origin = self.path.clone();
        let mut anchor = self.base_path.clone();
        let mut current = self;
        let mut hops = 0;
        loop {
            let target = match &current.contents {
                Contents::Regular(_) => return Ok(current),
                Contents::Symlink(target) => anchor.join(target),
            };
            if hops == max_hops {
                return Err(FileError::DanglingSymlink {
                    path: origin,
                    reason: format!("more than {max_hops} hops"),
                });
            }
            hops += 1;

            match std::fs::symlink_metadata(&target) {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(FileError::DanglingSymlink {
                        path: origin,
                        reason: format!("{} does not exist", target.display()),
                    });
                }
                Err(e) => return Err(FileError::io(target, e)),
            }
            anchor = target.parent().map_or_else(PathBuf::new, Path::to_path_buf);
            current = Self::from_path(&target, current.base_path)?;
        }
    }

    /// Write this buffer to `dest`.
    ///
    /// Regular content is staged in a sibling file, given this buffer's mode
    /// (and owner, when it differs), then renamed over `dest`.  A symlink
    /// replaces whatever is at `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`FileError::Io`] if any filesystem step fails; a staged file
    /// is cleaned up before returning.
    pub fn install_to(&self, dest: &Path) -> Result<(), FileError> {
        ensure_parent_dir(dest)?;
        match &self.contents {
            Contents::Regular(bytes) => {
                let staged = staging_path(dest);
                let result = self
                    .stage(&staged, bytes)
                    .and_then(|()| std::fs::rename(&staged, dest).map_err(|e| FileError::io(dest, e)));
                if result.is_err() {
                    let _ = std::fs::remove_file(&staged);
                }
                result
            }
            Contents::Symlink(target) => {
                remove_existing(dest)?;
                create_symlink(target, dest)
            }
        }
    }

    fn stage(&self, staged: &Path, bytes: &[u8]) -> Result<(), FileError> {
        std::fs::write(staged, bytes).map_err(|e| FileError::io(staged, e))?;
        apply_permissions(staged, self.mode, self.owner)
    }
}

#[cfg(unix)]
fn permissions_of(meta: &std::fs::Metadata) -> (u32, Option<Ownership>) {
    use std::os::unix::fs::MetadataExt as _;
    (
        meta.mode() & 0o7777,
        Some(Ownership {
            uid: meta.uid(),
            gid: meta.gid(),
        }),
    )
}

#[cfg(not(unix))]
fn permissions_of(meta: &std::fs::Metadata) -> (u32, Option<Ownership>) {
    let mode = if meta.permissions().readonly() { 0o444 } else { DEFAULT_MODE };
    (mode, None)
}

#[cfg(unix)]
fn apply_permissions(path: &Path, mode: u32, owner: Option<Ownership>) -> Result<(), FileError> {
    use std::os::unix::fs::{MetadataExt as _, PermissionsExt as _};
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| FileError::io(path, e))?;
    if let Some(owner) = owner {
        let meta = std::fs::metadata(path).map_err(|e| FileError::io(path, e))?;
        if meta.uid() != owner.uid || meta.gid() != owner.gid {
            std::os::unix::fs::chown(path, Some(owner.uid), Some(owner.gid))
                .map_err(|e| FileError::io(path, e))?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn apply_permissions(path: &Path, mode: u32, _owner: Option<Ownership>) -> Result<(), FileError> {
    let mut perms = std::fs::metadata(path)
        .map_err(|e| FileError::io(path, e))?
        .permissions();
    perms.set_readonly(mode & 0o222 == 0);
    std::fs::set_permissions(path, perms).map_err(|e| FileError::io(path, e))
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> Result<(), FileError> {
    std::os::unix::fs::symlink(target, link).map_err(|e| FileError::io(link, e))
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> Result<(), FileError> {
    std::os::windows::fs::symlink_file(target, link).map_err(|e| FileError::io(link, e))
}
