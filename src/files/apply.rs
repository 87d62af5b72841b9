//! Mapping overlays to pipeline steps and applying them.
use super::buffer::FileBuffer;
use super::repo::{PASSTHRU_STRATEGY, RepoFile};
use super::Env;
use crate::error::{ExecError, FileError};
use crate::report::{Report, ReportSink, Severity};

/// Report action recorded for every passthru script run.
pub const PASSTHRU_ACTION: &str = "passthru";

/// One step of the apply pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStep<'a> {
    /// Replace the buffer with the overlay file.
    Replace(&'a RepoFile),
    /// Pipe the buffer through the overlay script.
    Script(&'a RepoFile),
}

impl<'a> ApplyStep<'a> {
    /// Choose the step for `overlay` from its strategy.  Does no I/O.
    #[must_use]
    pub fn for_overlay(overlay: &'a RepoFile) -> Self {
        if overlay.strategy() == PASSTHRU_STRATEGY {
            Self::Script(overlay)
        } else {
            Self::Replace(overlay)
        }
    }

    /// The overlay this step applies.
    #[must_use]
    pub const fn overlay(&self) -> &'a RepoFile {
        match self {
            Self::Replace(overlay) | Self::Script(overlay) => overlay,
        }
    }

    /// Apply this step to `buffer`, consuming it.
    ///
    /// # Errors
    ///
    /// Replace fails with [`FileError::Io`] when the overlay cannot be read.
    /// Script fails with [`FileError::DanglingSymlink`] when the buffer's
    /// link chain does not resolve, or [`FileError::ScriptExecution`] when
    /// the script cannot run or exits unsuccessfully.
    pub fn apply(
        &self,
        buffer: FileBuffer,
        env: &Env<'_>,
        sink: &mut ReportSink,
    ) -> Result<FileBuffer, FileError> {
        match self {
            Self::Replace(overlay) => FileBuffer::from_path(overlay.path(), buffer.base_path()),
            Self::Script(overlay) => run_script(overlay, buffer, env, sink),
        }
    }
}

fn run_script(
    overlay: &RepoFile,
    buffer: FileBuffer,
    env: &Env<'_>,
    sink: &mut ReportSink,
) -> Result<FileBuffer, FileError> {
    let resolved = buffer.resolve_symlink(env.max_hops)?;
    let input = resolved.bytes().unwrap_or_default();
    let script = overlay.path();

    let mut report = Report::new(PASSTHRU_ACTION, script);
    let outcome = env.executor.run_with_input(
        script,
        &[script.as_os_str()],
        input,
        Some(env.script_timeout),
    );
    let result = match outcome {
        Ok(result) => result,
        Err(source) => {
            sink.push(report);
            return Err(FileError::ScriptExecution {
                path: script.to_path_buf(),
                source,
            });
        }
    };

    report.exit_code = result.code;
    let severity = if result.success { Severity::Info } else { Severity::Error };
    report.extend(severity, result.stderr_lines());
    sink.push(report);

    if !result.success {
        return Err(FileError::ScriptExecution {
            path: script.to_path_buf(),
            source: ExecError::Failed {
                program: script.display().to_string(),
                code: result.code,
                stderr: result.stderr.trim().to_string(),
            },
        });
    }

    Ok(FileBuffer::from_contents(result.stdout, script, resolved.base_path())
        .with_permissions(resolved.mode(), resolved.owner()))
}
