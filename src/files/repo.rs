//! Overlay descriptors and discovery in the resource directory.
//!
//! The resource directory holds *layers*: direct subdirectories applied in
//! byte-wise name order.  Inside a layer, `<rel>` replaces target `<rel>`
//! and `<rel>.passthru` is a script that transforms it.
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::fs::entry_exists;
use crate::error::FileError;

/// File-name suffix marking a passthru overlay.
pub const PASSTHRU_SUFFIX: &str = ".passthru";

/// Strategy name of script-transform overlays.
pub const PASSTHRU_STRATEGY: &str = "passthru";

/// Strategy name of replace overlays.
pub const REPLACE_STRATEGY: &str = "apply";

/// One overlay contributing to a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoFile {
    path: PathBuf,
    layer: String,
    strategy: String,
}

impl RepoFile {
    /// Describe an overlay at `path` in `layer` with the given strategy.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, layer: impl Into<String>, strategy: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            layer: layer.into(),
            strategy: strategy.into(),
        }
    }

    /// On-disk location of the overlay artifact.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the layer this overlay belongs to.
    #[must_use]
    pub fn layer(&self) -> &str {
        &self.layer
    }

    /// Application strategy: [`PASSTHRU_STRATEGY`] runs the artifact as a
    /// script, anything else replaces the buffer with it.
    #[must_use]
    pub fn strategy(&self) -> &str {
        &self.strategy
    }
}

/// Layer directories of `resource_dir` as `(name, path)`, sorted by name.
///
/// # Errors
///
/// Returns [`FileError::Io`] if the resource directory cannot be listed.
pub fn layers(resource_dir: &Path) -> Result<Vec<(String, PathBuf)>, FileError> {
    let entries = std::fs::read_dir(resource_dir).map_err(|e| FileError::io(resource_dir, e))?;
    let mut layers = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| FileError::io(resource_dir, e))?;
        let file_type = entry.file_type().map_err(|e| FileError::io(entry.path(), e))?;
        if file_type.is_dir() {
            layers.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
    }
    layers.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
    Ok(layers)
}

/// Ordered overlays for the target at relative path `rel`.
///
/// Layers come in name order; within one layer the replace overlay comes
/// before the passthru overlay.
///
/// # Errors
///
/// Returns [`FileError::Io`] if the resource directory cannot be listed.
pub fn overlays_for(resource_dir: &Path, rel: &Path) -> Result<Vec<RepoFile>, FileError> {
    let mut overlays = Vec::new();
    for (name, dir) in layers(resource_dir)? {
        let replace = dir.join(rel);
        let passthru = with_suffix(&replace, PASSTHRU_SUFFIX);
        if is_overlay(&replace) {
            overlays.push(RepoFile::new(replace, name.clone(), REPLACE_STRATEGY));
        }
        if is_overlay(&passthru) {
            overlays.push(RepoFile::new(passthru, name, PASSTHRU_STRATEGY));
        }
    }
    Ok(overlays)
}

/// Every relative target path with at least one overlay in any layer.
///
/// Symlinks inside a layer are overlays, never directories to descend into.
///
/// # Errors
///
/// Returns [`FileError::Io`] if any directory cannot be listed.
pub fn discover_targets(resource_dir: &Path) -> Result<BTreeSet<PathBuf>, FileError> {
    let mut targets = BTreeSet::new();
    for (_, layer_dir) in layers(resource_dir)? {
        let mut pending = vec![layer_dir.clone()];
        while let Some(dir) = pending.pop() {
            for entry in std::fs::read_dir(&dir).map_err(|e| FileError::io(&dir, e))? {
                let entry = entry.map_err(|e| FileError::io(&dir, e))?;
                let path = entry.path();
                let file_type = entry.file_type().map_err(|e| FileError::io(&path, e))?;
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                if let Ok(rel) = path.strip_prefix(&layer_dir) {
                    targets.insert(target_of(rel));
                }
            }
        }
    }
    Ok(targets)
}

/// Map an overlay's layer-relative path to the target it applies to.
fn target_of(rel: &Path) -> PathBuf {
    let name = rel.file_name().map(|n| n.to_string_lossy().into_owned());
    match name.as_deref().and_then(|n| n.strip_suffix(PASSTHRU_SUFFIX)) {
        Some(stem) if !stem.is_empty() => rel.with_file_name(stem),
        _ => rel.to_path_buf(),
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn is_overlay(path: &Path) -> bool {
    entry_exists(path) && !path.symlink_metadata().is_ok_and(|m| m.is_dir())
}
