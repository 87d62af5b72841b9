//! Per-target state: live file, base snapshot, and provisioned copy.
use std::path::{Path, PathBuf};

use super::buffer::FileBuffer;
use super::diff::{self, DiffSide};
use super::fs::entry_exists;
use super::repo::{RepoFile, overlays_for};
use super::{Env, pipeline};
use crate::config::PathsConfig;
use crate::error::FileError;
use crate::report::ReportSink;

/// Skip reason for a live file changed since it was last provisioned.
pub const DRIFT_REASON: &str = "modified since last provisioning, use --force to overwrite";

/// Result of applying one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The live target was rewritten.
    Changed,
    /// The live target already matched the computed contents.
    Unchanged,
    /// Nothing was done.
    Skipped {
        /// Why the target was left alone.
        reason: String,
    },
}

/// A provisioned file and the overlays that produce it.
#[derive(Debug, Clone)]
pub struct TargetFile {
    rel: PathBuf,
    live: PathBuf,
    base: PathBuf,
    provisioned: PathBuf,
    overlays: Vec<RepoFile>,
}

impl TargetFile {
    /// Look up the overlays for relative path `rel`.
    ///
    /// # Errors
    ///
    /// Returns [`FileError::Io`] if the resource directory cannot be listed.
    pub fn load(rel: &Path, paths: &PathsConfig) -> Result<Self, FileError> {
        let overlays = overlays_for(&paths.resource_dir, rel)?;
        Ok(Self::with_overlays(rel, paths, overlays))
    }

    /// Build a target with an explicit overlay list.
    #[must_use]
    pub fn with_overlays(rel: &Path, paths: &PathsConfig, overlays: Vec<RepoFile>) -> Self {
        Self {
            rel: rel.to_path_buf(),
            live: paths.root.join(rel),
            base: paths.state_dir.join("base").join(rel),
            provisioned: paths.state_dir.join("provisioned").join(rel),
            overlays,
        }
    }

    /// Path relative to the managed root.
    #[must_use]
    pub fn rel(&self) -> &Path {
        &self.rel
    }

    /// User-facing absolute name, independent of the configured root.
    #[must_use]
    pub fn display_path(&self) -> PathBuf {
        Path::new("/").join(&self.rel)
    }

    /// The file being managed.
    #[must_use]
    pub fn live_path(&self) -> &Path {
        &self.live
    }

    /// Snapshot of the target taken before it was first provisioned.
    #[must_use]
    pub fn base_snapshot_path(&self) -> &Path {
        &self.base
    }

    /// Copy of what was last installed.
    #[must_use]
    pub fn provisioned_path(&self) -> &Path {
        &self.provisioned
    }

    /// Overlays in application order.
    #[must_use]
    pub fn overlays(&self) -> &[RepoFile] {
        &self.overlays
    }

    /// Directory relative symlinks in any buffer of this target resolve against.
    fn base_dir(&self) -> &Path {
        self.live.parent().unwrap_or_else(|| Path::new("/"))
    }

    /// The pipeline's starting buffer.
    ///
    /// Uses the base snapshot when there is one.  A target that was
    /// provisioned without a snapshot did not exist beforehand, so its
    /// starting point is the null baseline.  Otherwise the live file is read.
    ///
    /// # Errors
    ///
    /// Returns [`FileError::Io`] if the chosen file cannot be read.
    pub fn initial_buffer(&self) -> Result<FileBuffer, FileError> {
        if entry_exists(&self.base) {
            FileBuffer::from_path(&self.base, self.base_dir())
        } else if entry_exists(&self.provisioned) {
            Ok(FileBuffer::null(&self.live, self.base_dir()))
        } else {
            FileBuffer::from_path(&self.live, self.base_dir())
        }
    }

    /// Save the live file as the base snapshot unless this target was
    /// provisioned before.  Returns whether a snapshot was written.
    ///
    /// # Errors
    ///
    /// Returns [`FileError::Io`] if the live file cannot be read or the
    /// snapshot cannot be written.
    pub fn ensure_base_snapshot(&self) -> Result<bool, FileError> {
        if entry_exists(&self.base) || entry_exists(&self.provisioned) || !entry_exists(&self.live) {
            return Ok(false);
        }
        FileBuffer::from_path(&self.live, self.base_dir())?.install_to(&self.base)?;
        Ok(true)
    }

    /// `true` if the live file no longer matches what was last installed.
    ///
    /// # Errors
    ///
    /// Returns [`FileError::Io`] if either file cannot be read.
    pub fn has_drifted(&self) -> Result<bool, FileError> {
        if !entry_exists(&self.provisioned) {
            return Ok(false);
        }
        let provisioned = FileBuffer::from_path(&self.provisioned, self.base_dir())?;
        let live = FileBuffer::from_path(&self.live, self.base_dir())?;
        Ok(!provisioned.matches(&live))
    }

    /// Run the overlays over the initial buffer.
    ///
    /// # Errors
    ///
    /// Returns the first pipeline error.
    pub fn compute(&self, env: &Env<'_>, sink: &mut ReportSink) -> Result<FileBuffer, FileError> {
        pipeline::run(self.initial_buffer()?, &self.overlays, env, sink)
    }

    /// `true` if applying would rewrite the live file.
    ///
    /// # Errors
    ///
    /// Returns the first pipeline error, or [`FileError::Io`] if the live
    /// file cannot be read.
    pub fn would_change(&self, env: &Env<'_>, sink: &mut ReportSink) -> Result<bool, FileError> {
        let candidate = self.compute(env, sink)?;
        let live = FileBuffer::from_path(&self.live, self.base_dir())?;
        Ok(!candidate.matches(&live))
    }

    /// Compute the target and install it.
    ///
    /// A live file changed since the last run is left alone unless `force`
    /// is set.  The live file is only written after the whole pipeline
    /// succeeded.
    ///
    /// # Errors
    ///
    /// Returns the first pipeline error, or [`FileError::Io`] if reading
    /// state or installing fails.
    pub fn apply(&self, env: &Env<'_>, sink: &mut ReportSink, force: bool) -> Result<ApplyOutcome, FileError> {
        if self.overlays.is_empty() {
            return Ok(ApplyOutcome::Skipped {
                reason: "no overlays".to_string(),
            });
        }
        if !force && self.has_drifted()? {
            return Ok(ApplyOutcome::Skipped {
                reason: DRIFT_REASON.to_string(),
            });
        }

        let candidate = self.compute(env, sink)?;
        self.ensure_base_snapshot()?;

        let live = FileBuffer::from_path(&self.live, self.base_dir())?;
        if candidate.matches(&live) {
            candidate.install_to(&self.provisioned)?;
            return Ok(ApplyOutcome::Unchanged);
        }
        candidate.install_to(&self.live)?;
        candidate.install_to(&self.provisioned)?;
        Ok(ApplyOutcome::Changed)
    }

    /// Diff what was last provisioned against the live file, followed by the
    /// live file against what applying would produce now.
    ///
    /// The first part is omitted for a target that was never provisioned.
    ///
    /// # Errors
    ///
    /// Returns the first pipeline or diff error.
    pub fn render_diff(&self, env: &Env<'_>, sink: &mut ReportSink) -> Result<String, FileError> {
        let target = self.display_path();
        let mut out = String::new();
        if entry_exists(&self.provisioned) {
            out.push_str(&diff::render(
                DiffSide::File(&self.provisioned),
                DiffSide::File(&self.live),
                &target,
                env,
                sink,
            )?);
        }
        let candidate = self.compute(env, sink)?;
        out.push_str(&diff::render(
            DiffSide::File(&self.live),
            DiffSide::Buffer(&candidate),
            &target,
            env,
            sink,
        )?);
        Ok(out)
    }
}
