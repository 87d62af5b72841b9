//! Domain-specific error types for the provisioning engine.
//!
//! Internal modules return typed errors (e.g., [`FileError`], [`ConfigError`])
//! while command handlers at the CLI boundary convert them to
//! [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! StrataError
//! ├── Config(ConfigError) — TOML parsing, path settings
//! └── File(FileError)     — buffers, symlinks, overlay scripts, diffs
//!     └── ExecError       — external program launch, timeout, exit status
//! ```

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the provisioning engine.
#[derive(Error, Debug)]
pub enum StrataError {
    /// Configuration-related error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error raised while computing, diffing, or installing a target file.
    #[error("File error: {0}")]
    File(#[from] FileError),
}

/// Errors that arise from configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file contains a syntax or type error.
    #[error("Invalid TOML in {file}: {message}")]
    InvalidSyntax {
        /// Path to the offending file.
        file: String,
        /// Parser message.
        message: String,
    },

    /// An I/O error occurred while reading a config file.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that arise while running an external program.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The program could not be started at all.
    #[error("failed to launch {program}: {source}")]
    Launch {
        /// Program that was invoked.
        program: String,
        /// Underlying spawn error.
        source: std::io::Error,
    },

    /// Feeding stdin or collecting output failed.
    #[error("I/O error while running {program}: {source}")]
    Io {
        /// Program that was invoked.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The program did not exit within the allotted time and was killed.
    #[error("{program} timed out after {}s", .timeout.as_secs())]
    Timeout {
        /// Program that was invoked.
        program: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The program exited unsuccessfully.
    #[error("{program} failed (exit {}): {stderr}", .code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    Failed {
        /// Program that was invoked.
        program: String,
        /// Exit code, or `None` when terminated by a signal.
        code: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },
}

/// Errors raised by the file-application pipeline and the diff renderer.
#[derive(Error, Debug)]
pub enum FileError {
    /// A path could not be read or written.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// Path that could not be accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A symlink chain does not end in an existing file.
    #[error("dangling symlink {}: {reason}", .path.display())]
    DanglingSymlink {
        /// The link that could not be resolved.
        path: PathBuf,
        /// Why resolution stopped.
        reason: String,
    },

    /// A passthru overlay could not be run or exited unsuccessfully.
    #[error("execution of {} failed: {source}", .path.display())]
    ScriptExecution {
        /// Path of the overlay script.
        path: PathBuf,
        /// Underlying execution error.
        source: ExecError,
    },

    /// The diff tool could not be run.
    #[error("cannot render diff for {}: {source}", .target.display())]
    DiffTool {
        /// User-facing target path the diff was rendered for.
        target: PathBuf,
        /// Underlying execution error.
        source: ExecError,
    },

    /// The run was interrupted between two overlay steps.
    #[error("interrupted before applying {}", .next.display())]
    Cancelled {
        /// The overlay that would have been applied next.
        next: PathBuf,
    },
}

impl FileError {
    /// Shorthand for [`FileError::Io`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
