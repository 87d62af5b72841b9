//! Command: list targets and the overlays that produce them.
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use super::CommandSetup;
use crate::cli::{GlobalOpts, ScanOpts};
use crate::files::{RepoFile, TargetFile};
use crate::logging::Log;

/// One target in `scan --json` output.
#[derive(Debug, Serialize)]
struct ScanEntry<'a> {
    target: PathBuf,
    overlays: &'a [RepoFile],
}

/// Run the scan command, writing the listing to `out`.
///
/// # Errors
///
/// Returns an error if configuration loading or target discovery fails, or
/// writing to `out` fails.
pub fn run(global: &GlobalOpts, opts: &ScanOpts, log: &dyn Log, out: &mut dyn Write) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let targets = setup.targets(&[], log)?;
    if opts.json {
        write_json(&targets, out)?;
    } else {
        write_text(&targets, out)?;
    }
    out.flush()?;
    Ok(())
}

fn write_text(targets: &[TargetFile], out: &mut dyn Write) -> Result<()> {
    for target in targets {
        writeln!(out, "{}", target.display_path().display())?;
        for overlay in target.overlays() {
            writeln!(
                out,
                "    {:<8} {} ({})",
                overlay.strategy(),
                overlay.path().display(),
                overlay.layer()
            )?;
        }
    }
    Ok(())
}

fn write_json(targets: &[TargetFile], out: &mut dyn Write) -> Result<()> {
    let entries: Vec<ScanEntry<'_>> = targets
        .iter()
        .map(|t| ScanEntry {
            target: t.display_path(),
            overlays: t.overlays(),
        })
        .collect();
    serde_json::to_writer_pretty(&mut *out, &entries)?;
    writeln!(out)?;
    Ok(())
}
