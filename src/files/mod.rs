//! Layered file provisioning: buffers, overlays, the apply pipeline, diffs,
//! and per-target state.
pub mod apply;
pub mod buffer;
pub mod diff;
pub mod fs;
pub mod pipeline;
pub mod repo;
pub mod target;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::Config;
use crate::exec::Executor;

pub use apply::ApplyStep;
pub use buffer::{Contents, FileBuffer, Ownership};
pub use diff::DiffSide;
pub use repo::RepoFile;
pub use target::{ApplyOutcome, TargetFile};

/// Everything a pipeline step or diff needs beyond its buffer.
///
/// Borrowed for the duration of one target; the executor and cancel flag are
/// shared between targets processed in parallel.
#[derive(Debug, Clone, Copy)]
pub struct Env<'a> {
    /// Runs passthru scripts and the diff tool.
    pub executor: &'a dyn Executor,
    /// Upper bound for one passthru script.
    pub script_timeout: Duration,
    /// Program invoked as `<diff_program> -u <from> <to>`.
    pub diff_program: &'a Path,
    /// Upper bound for one diff invocation.
    pub diff_timeout: Duration,
    /// Symlink hops followed before a chain counts as dangling.
    pub max_hops: usize,
    /// Set when the run should stop before the next step.
    pub cancel: &'a AtomicBool,
}

impl<'a> Env<'a> {
    /// Build an environment from loaded configuration.
    #[must_use]
    pub fn from_config(config: &'a Config, executor: &'a dyn Executor, cancel: &'a AtomicBool) -> Self {
        Self {
            executor,
            script_timeout: config.exec.script_timeout(),
            diff_program: Path::new(&config.exec.diff_program),
            diff_timeout: config.exec.diff_timeout(),
            max_hops: config.symlinks.max_hops,
            cancel,
        }
    }

    /// `true` once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

/// Shared fixtures for unit tests in this module tree.
#[cfg(test)]
pub(crate) mod test_helpers {
    use super::Env;
    use crate::exec::Executor;
    use std::path::Path;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    /// An environment with short timeouts around `executor`.
    pub(crate) fn env<'a>(executor: &'a dyn Executor, cancel: &'a AtomicBool) -> Env<'a> {
        Env {
            executor,
            script_timeout: Duration::from_secs(10),
            diff_program: Path::new("diff"),
            diff_timeout: Duration::from_secs(10),
            max_hops: 20,
            cancel,
        }
    }
}
