//! Command: compute targets and install them.
use std::sync::atomic::AtomicBool;

use anyhow::Result;

use super::{CommandSetup, run_targets};
use crate::cli::{ApplyOpts, GlobalOpts};
use crate::error::FileError;
use crate::exec::SystemExecutor;
use crate::files::target::DRIFT_REASON;
use crate::files::{ApplyOutcome, Env, TargetFile};
use crate::logging::{Log, Logger, TargetStatus};
use crate::report::ReportSink;

/// Run the apply command.
///
/// # Errors
///
/// Returns an error if configuration loading or target discovery fails, or
/// if any target failed to apply.
pub fn run(global: &GlobalOpts, opts: &ApplyOpts, log: &Logger, cancel: &AtomicBool) -> Result<()> {
    let version = super::version::version();
    log.info(&format!("strata {version}"));

    let setup = CommandSetup::init(global, log)?;
    let targets = setup.targets(&opts.targets, log)?;
    let executor = SystemExecutor;
    let env = Env::from_config(&setup.config, &executor, cancel);

    log.stage(if opts.dry_run {
        "Planning targets"
    } else {
        "Applying targets"
    });
    let results = run_targets(&targets, global.parallel, |target, sink| {
        apply_one(target, &env, sink, opts)
    });
    for (target, (result, sink)) in targets.iter().zip(&results) {
        sink.render(log);
        record(log, target, result);
    }

    log.print_summary();

    if env.is_cancelled() {
        anyhow::bail!("interrupted");
    }
    let failed = log.failure_count();
    if failed > 0 {
        anyhow::bail!("{failed} target(s) failed");
    }
    Ok(())
}

/// Status and optional note for one target.
type Step = (TargetStatus, Option<String>);

fn apply_one(
    target: &TargetFile,
    env: &Env<'_>,
    sink: &mut ReportSink,
    opts: &ApplyOpts,
) -> Result<Step, FileError> {
    if !opts.dry_run {
        return Ok(match target.apply(env, sink, opts.force)? {
            ApplyOutcome::Changed => (TargetStatus::Changed, None),
            ApplyOutcome::Unchanged => (TargetStatus::Unchanged, None),
            ApplyOutcome::Skipped { reason } => (TargetStatus::Skipped, Some(reason)),
        });
    }

    if target.overlays().is_empty() {
        return Ok((TargetStatus::Skipped, Some("no overlays".to_string())));
    }
    if !opts.force && target.has_drifted()? {
        return Ok((TargetStatus::Skipped, Some(DRIFT_REASON.to_string())));
    }
    Ok(if target.would_change(env, sink)? {
        (TargetStatus::DryRun, Some("would change".to_string()))
    } else {
        (TargetStatus::Unchanged, None)
    })
}

fn record(log: &dyn Log, target: &TargetFile, result: &Result<Step, FileError>) {
    let name = target.display_path().display().to_string();
    match result {
        Ok((status, note)) => {
            match status {
                TargetStatus::Changed => log.info(&format!("updated {name}")),
                TargetStatus::DryRun => log.dry_run(&format!("would update {name}")),
                TargetStatus::Skipped => log.warn(&format!(
                    "skipping {name}: {}",
                    note.as_deref().unwrap_or("no reason given")
                )),
                TargetStatus::Unchanged | TargetStatus::Failed => {
                    log.debug(&format!("{name} is up to date"));
                }
            }
            log.record_target(&name, *status, note.as_deref());
        }
        Err(e) => {
            log.error(&format!("{name}: {e}"));
            log.record_target(&name, TargetStatus::Failed, Some(&e.to_string()));
        }
    }
}
