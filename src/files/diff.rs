//! Unified diffs between buffers and on-disk files via an external `diff -u`.
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use super::buffer::FileBuffer;
use super::fs::entry_exists;
use super::Env;
use crate::error::{ExecError, FileError};
use crate::report::{Report, ReportSink, Severity};

/// Report action recorded for every diff invocation.
pub const DIFF_ACTION: &str = "diff";

/// Path standing in for an absent side.
#[cfg(unix)]
pub const NULL_DEVICE: &str = "/dev/null";
/// Path standing in for an absent side.
#[cfg(windows)]
pub const NULL_DEVICE: &str = "NUL";

/// One side of a diff.
#[derive(Debug, Clone, Copy)]
pub enum DiffSide<'a> {
    /// Nothing: diffed as the null device.
    Null,
    /// A file or symlink on disk; absent paths count as [`DiffSide::Null`].
    File(&'a Path),
    /// An in-memory buffer.
    Buffer(&'a FileBuffer),
}

impl DiffSide<'_> {
    fn is_null(&self) -> bool {
        match self {
            Self::Null => true,
            Self::File(path) => !entry_exists(path),
            Self::Buffer(_) => false,
        }
    }

    /// Write this side into `dir` as `name` and return the path to diff.
    ///
    /// Symlinks are written as their link text.
    fn materialize(&self, dir: &Path, name: &str) -> Result<PathBuf, FileError> {
        let bytes = match self {
            Self::Null => return Ok(PathBuf::from(NULL_DEVICE)),
            Self::File(path) if !entry_exists(path) => return Ok(PathBuf::from(NULL_DEVICE)),
            Self::File(path) => {
                let base = path.parent().unwrap_or_else(|| Path::new(""));
                FileBuffer::from_path(path, base)?.diff_bytes().into_owned()
            }
            Self::Buffer(buffer) => buffer.diff_bytes().into_owned(),
        };
        let dest = dir.join(name);
        std::fs::write(&dest, bytes).map_err(|e| FileError::io(&dest, e))?;
        Ok(dest)
    }
}

/// Render a unified diff from `from` to `to`, labelled with `target`.
///
/// Returns an empty string when both sides are identical.  One report is
/// pushed to `sink` per invocation of the diff program.
///
/// # Errors
///
/// Returns [`FileError::DiffTool`] if the diff program cannot run, times
/// out, or exits with status 2 or higher, and [`FileError::Io`] if a side
/// cannot be read or staged.
pub fn render(
    from: DiffSide<'_>,
    to: DiffSide<'_>,
    target: &Path,
    env: &Env<'_>,
    sink: &mut ReportSink,
) -> Result<String, FileError> {
    let staging = tempfile::Builder::new()
        .prefix("strata-diff-")
        .tempdir()
        .map_err(|e| FileError::io(std::env::temp_dir(), e))?;
    let from_path = from.materialize(staging.path(), "a")?;
    let to_path = to.materialize(staging.path(), "b")?;

    let mut report = Report::new(DIFF_ACTION, target);
    let args: [&OsStr; 3] = [OsStr::new("-u"), from_path.as_os_str(), to_path.as_os_str()];
    let result = match env
        .executor
        .run_with_input(env.diff_program, &args, b"", Some(env.diff_timeout))
    {
        Ok(result) => result,
        Err(source) => {
            sink.push(report);
            return Err(FileError::DiffTool {
                target: target.to_path_buf(),
                source,
            });
        }
    };

    report.exit_code = result.code;
    let trouble = !matches!(result.code, Some(0 | 1));
    let severity = if trouble { Severity::Error } else { Severity::Warning };
    report.extend(severity, result.stderr_lines());
    sink.push(report);

    if trouble {
        return Err(FileError::DiffTool {
            target: target.to_path_buf(),
            source: ExecError::Failed {
                program: env.diff_program.display().to_string(),
                code: result.code,
                stderr: result.stderr.trim().to_string(),
            },
        });
    }

    let output = String::from_utf8_lossy(&result.stdout);
    let mut lines = output.split_inclusive('\n').peekable();
    let mut stripped = 0;
    while stripped < 2 && lines.next_if(|l| l.starts_with("--- ") || l.starts_with("+++ ")).is_some() {
        stripped += 1;
    }
    let body: String = lines.collect();
    if body.is_empty() {
        return Ok(String::new());
    }
    if stripped > 0 {
        return Ok(header(target, from.is_null(), to.is_null()) + &body);
    }

    // No unified header, e.g. "Binary files A and B differ": keep the
    // message but name the target instead of the staged files.
    let name = display_name(target);
    let body = body
        .replace(&*from_path.to_string_lossy(), &side_label(&name, "a", from.is_null()))
        .replace(&*to_path.to_string_lossy(), &side_label(&name, "b", to.is_null()));
    Ok(format!("diff --strata a/{name} b/{name}\n{body}"))
}

fn display_name(target: &Path) -> String {
    target.to_string_lossy().trim_start_matches('/').to_string()
}

fn side_label(name: &str, prefix: &str, null: bool) -> String {
    if null {
        NULL_DEVICE.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Header naming the user-facing target in place of the staged temp paths.
fn header(target: &Path, from_null: bool, to_null: bool) -> String {
    let name = display_name(target);
    format!(
        "diff --strata a/{name} b/{name}\n--- {}\n+++ {}\n",
        side_label(&name, "a", from_null),
        side_label(&name, "b", to_null)
    )
}
