use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::Parser;

use strata_cli::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    let command = match args.command {
        cli::Command::Apply(_) => "apply",
        cli::Command::Diff(_) => "diff",
        cli::Command::Scan(_) => "scan",
        cli::Command::Version => {
            commands::version::run(&mut std::io::stdout())?;
            return Ok(());
        }
    };
    logging::init_subscriber(args.verbose, command);
    let log = logging::Logger::new(command);

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        log.warn(&format!("cannot install interrupt handler: {e}"));
    }

    let mut stdout = std::io::stdout();
    match &args.command {
        cli::Command::Apply(opts) => commands::apply::run(&args.global, opts, &log, &cancel),
        cli::Command::Diff(opts) => {
            commands::diff::run(&args.global, opts, &log, &cancel, &mut stdout)
        }
        cli::Command::Scan(opts) => commands::scan::run(&args.global, opts, &log, &mut stdout),
        cli::Command::Version => Ok(()),
    }
}
