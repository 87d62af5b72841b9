use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the layered file provisioning engine.
#[derive(Parser, Debug)]
#[command(
    name = "strata",
    about = "Provision configuration files from ordered overlay layers",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Configuration file (default: $STRATA_CONFIG or /etc/strata.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the managed root directory
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Process targets one at a time (parallel is enabled by default)
    #[arg(long = "no-parallel", global = true, action = clap::ArgAction::SetFalse)]
    pub parallel: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute targets from their overlays and install them
    Apply(ApplyOpts),
    /// Show drift and pending changes as unified diffs
    Diff(DiffOpts),
    /// List targets and the overlays contributing to each
    Scan(ScanOpts),
    /// Print version information
    Version,
}

/// Options for the `apply` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct ApplyOpts {
    /// Targets to apply (absolute or relative to root; default: all)
    pub targets: Vec<PathBuf>,

    /// Overwrite targets that were modified since they were last provisioned
    #[arg(short, long)]
    pub force: bool,

    /// Preview changes without applying
    #[arg(short = 'd', long)]
    pub dry_run: bool,
}

/// Options for the `diff` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct DiffOpts {
    /// Targets to diff (absolute or relative to root; default: all)
    pub targets: Vec<PathBuf>,
}

/// Options for the `scan` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct ScanOpts {
    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_apply_with_targets() {
        let cli = Cli::parse_from(["strata", "apply", "/etc/motd", "etc/hosts"]);
        let Command::Apply(opts) = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(
            opts.targets,
            vec![PathBuf::from("/etc/motd"), PathBuf::from("etc/hosts")]
        );
        assert!(!opts.force);
        assert!(!opts.dry_run);
    }

    #[test]
    fn parse_apply_force_and_dry_run() {
        let cli = Cli::parse_from(["strata", "apply", "--force", "-d"]);
        let Command::Apply(opts) = cli.command else {
            panic!("expected apply");
        };
        assert!(opts.force);
        assert!(opts.dry_run);
        assert!(opts.targets.is_empty());
    }

    #[test]
    fn parse_diff() {
        let cli = Cli::parse_from(["strata", "diff", "/etc/motd"]);
        assert!(matches!(cli.command, Command::Diff(ref o) if o.targets.len() == 1));
    }

    #[test]
    fn parse_scan_json() {
        let cli = Cli::parse_from(["strata", "scan", "--json"]);
        assert!(matches!(cli.command, Command::Scan(ScanOpts { json: true })));
    }

    #[test]
    fn parse_version() {
        let cli = Cli::parse_from(["strata", "version"]);
        assert!(matches!(cli.command, Command::Version));
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::parse_from(["strata", "-v", "scan"]);
        assert!(cli.verbose);
    }

    #[test]
    fn parse_config_and_root_overrides() {
        let cli = Cli::parse_from(["strata", "--config", "/tmp/s.toml", "--root", "/mnt", "scan"]);
        assert_eq!(cli.global.config, Some(PathBuf::from("/tmp/s.toml")));
        assert_eq!(cli.global.root, Some(PathBuf::from("/mnt")));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["strata", "diff", "--root", "/mnt", "-v"]);
        assert_eq!(cli.global.root, Some(PathBuf::from("/mnt")));
        assert!(cli.verbose);
    }

    #[test]
    fn parallel_is_enabled_by_default() {
        let cli = Cli::parse_from(["strata", "apply"]);
        assert!(cli.global.parallel, "parallel should be true by default");
    }

    #[test]
    fn no_parallel_disables_parallel() {
        let cli = Cli::parse_from(["strata", "--no-parallel", "apply"]);
        assert!(
            !cli.global.parallel,
            "--no-parallel should set parallel to false"
        );
    }
}
