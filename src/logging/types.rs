//! Core logging types: per-target summary entries, status, and the [`Log`] trait.

/// Outcome of one target for summary reporting.
#[derive(Debug, Clone)]
pub struct TargetEntry {
    /// User-facing target path.
    pub name: String,
    /// Final status of the target.
    pub status: TargetStatus,
    /// Optional detail message (e.g., skip reason or error description).
    pub message: Option<String>,
}

/// Status of a processed target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStatus {
    /// The computed content was installed.
    Changed,
    /// The live target already matched the computed content.
    Unchanged,
    /// The target was left alone (e.g., modified outside of strata).
    Skipped,
    /// Dry run; the change was previewed but not installed.
    DryRun,
    /// Computing or installing the target failed.
    Failed,
}

/// Abstraction over logging backends.
///
/// Command code and report rendering log through this trait so tests can
/// capture output without a global subscriber.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record a target result for the summary.
    fn record_target(&self, name: &str, status: TargetStatus, message: Option<&str>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_status_equality() {
        assert_eq!(TargetStatus::Changed, TargetStatus::Changed);
        assert_ne!(TargetStatus::Changed, TargetStatus::Failed);
        assert_ne!(TargetStatus::Skipped, TargetStatus::DryRun);
    }

    #[test]
    fn target_entry_clone() {
        let entry = TargetEntry {
            name: "/etc/motd".to_string(),
            status: TargetStatus::Unchanged,
            message: Some("already provisioned".to_string()),
        };
        let cloned = entry.clone();
        assert_eq!(cloned.name, entry.name);
        assert_eq!(cloned.status, entry.status);
        assert_eq!(cloned.message, entry.message);
    }
}
