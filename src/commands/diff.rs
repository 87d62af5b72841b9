//! Command: print drift and pending changes as unified diffs.
use std::io::Write;
use std::sync::atomic::AtomicBool;

use anyhow::Result;

use super::{CommandSetup, run_targets};
use crate::cli::{DiffOpts, GlobalOpts};
use crate::exec::SystemExecutor;
use crate::files::Env;
use crate::logging::Log;

/// Run the diff command, writing diffs to `out` in target order.
///
/// # Errors
///
/// Returns an error if configuration loading or target discovery fails,
/// writing to `out` fails, or any target could not be diffed.
pub fn run(
    global: &GlobalOpts,
    opts: &DiffOpts,
    log: &dyn Log,
    cancel: &AtomicBool,
    out: &mut dyn Write,
) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let targets = setup.targets(&opts.targets, log)?;
    let executor = SystemExecutor;
    let env = Env::from_config(&setup.config, &executor, cancel);

    let results = run_targets(&targets, global.parallel, |target, sink| {
        target.render_diff(&env, sink)
    });

    let mut failed = 0usize;
    for (target, (result, sink)) in targets.iter().zip(&results) {
        sink.render(log);
        match result {
            Ok(text) => out.write_all(text.as_bytes())?,
            Err(e) => {
                log.error(&format!("{}: {e}", target.display_path().display()));
                failed += 1;
            }
        }
    }
    out.flush()?;

    if failed > 0 {
        anyhow::bail!("{failed} target(s) could not be diffed");
    }
    Ok(())
}
