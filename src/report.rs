//! Per-action reports collected while a target is processed.
//!
//! Every side-effecting external action (a passthru script run, a diff tool
//! invocation) produces one [`Report`].  Reports are pushed into a
//! [`ReportSink`] owned by the caller and passed explicitly through the
//! pipeline, so concurrent targets never share a sink.  Rendering is
//! deferred and skips reports without diagnostic output.
use std::path::{Path, PathBuf};

use crate::logging::Log;

/// Severity of one diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational output (e.g. stderr of a successful script).
    Info,
    /// Something unexpected that did not stop the action.
    Warning,
    /// The action failed.
    Error,
}

/// Record of one external action and its diagnostic output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// What was done (`"passthru"`, `"diff"`).
    pub action: String,
    /// The path the action was performed for.
    pub target: PathBuf,
    /// Exit code of the external program, if it ran to completion.
    pub exit_code: Option<i32>,
    lines: Vec<(Severity, String)>,
}

impl Report {
    /// Start a report for `action` on `target`.
    #[must_use]
    pub fn new(action: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            action: action.into(),
            target: target.into(),
            exit_code: None,
            lines: Vec::new(),
        }
    }

    /// Append a diagnostic line.
    pub fn add(&mut self, severity: Severity, line: impl Into<String>) {
        self.lines.push((severity, line.into()));
    }

    /// Append each of `lines` with the same severity.
    pub fn extend<I, S>(&mut self, severity: Severity, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines
            .extend(lines.into_iter().map(|l| (severity, l.into())));
    }

    /// Diagnostic lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[(Severity, String)] {
        &self.lines
    }

    /// `true` when the report carries no diagnostic output.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// `true` when any line has [`Severity::Error`].
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.lines.iter().any(|(s, _)| *s == Severity::Error)
    }

    /// Render this report through `log` unless it is empty.
    ///
    /// Returns whether anything was rendered.
    pub fn render_unless_empty(&self, log: &dyn Log) -> bool {
        if self.is_empty() {
            return false;
        }
        log.info(&format!("{} {}", self.action, self.target.display()));
        for (severity, line) in &self.lines {
            match severity {
                Severity::Info => log.info(&format!("  {line}")),
                Severity::Warning => log.warn(&format!("  {line}")),
                Severity::Error => log.error(&format!("  {line}")),
            }
        }
        true
    }
}

/// Ordered collection of [`Report`]s for one target.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportSink {
    reports: Vec<Report>,
}

impl ReportSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a finished report.
    pub fn push(&mut self, report: Report) {
        self.reports.push(report);
    }

    /// All reports in the order they were recorded.
    #[must_use]
    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    /// Number of recorded reports, empty ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Reports recorded for `target`.
    pub fn for_target<'a>(&'a self, target: &'a Path) -> impl Iterator<Item = &'a Report> + 'a {
        self.reports.iter().filter(move |r| r.target == target)
    }

    /// Render every non-empty report; returns how many were rendered.
    pub fn render(&self, log: &dyn Log) -> usize {
        self.reports
            .iter()
            .filter(|r| r.render_unless_empty(log))
            .count()
    }
}
