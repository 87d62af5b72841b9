//! Top-level subcommand orchestration.
pub mod apply;
pub mod diff;
pub mod scan;
pub mod version;

use std::path::{Component, Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::{Config, resolve_config_path};
use crate::files::{TargetFile, repo};
use crate::logging::Log;
use crate::report::ReportSink;

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates configuration loading, the root override, and target
/// selection so that each command does not have to repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    pub config: Config,
}

impl CommandSetup {
    /// Load configuration, apply `--root`, and report validation warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or parsed.
    pub fn init(global: &GlobalOpts, log: &dyn Log) -> Result<Self> {
        let path = resolve_config_path(global.config.as_deref());

        let mut config = Config::load(&path)
            .with_context(|| format!("loading configuration from {}", path.display()))?;
        if let Some(root) = &global.root {
            config = config.with_root(root.clone());
        }
        log.debug(&format!("config: {}", path.display()));
        log.debug(&format!("root: {}", config.paths.root.display()));
        log.debug(&format!("resources: {}", config.paths.resource_dir.display()));
        log.debug(&format!("state: {}", config.paths.state_dir.display()));

        // Validate configuration and display warnings
        let warnings = config.validate();
        if !warnings.is_empty() {
            log.warn(&format!(
                "found {} configuration warning(s):",
                warnings.len()
            ));
            for warning in &warnings {
                log.warn(&format!("  [{}]: {}", warning.item, warning.message));
            }
        }

        Ok(Self { config })
    }

    /// Targets named on the command line, or every discovered target.
    ///
    /// # Errors
    ///
    /// Returns an error if a requested path lies outside the managed root or
    /// the resource directory cannot be read.
    pub fn targets(&self, requested: &[PathBuf], log: &dyn Log) -> Result<Vec<TargetFile>> {
        let paths = &self.config.paths;
        let rels: Vec<PathBuf> = if requested.is_empty() {
            repo::discover_targets(&paths.resource_dir)
                .with_context(|| format!("scanning {}", paths.resource_dir.display()))?
                .into_iter()
                .collect()
        } else {
            requested
                .iter()
                .map(|p| resolve_target(&paths.root, p))
                .collect::<Result<_>>()?
        };
        log.debug(&format!("{} target(s) selected", rels.len()));

        rels.iter()
            .map(|rel| {
                TargetFile::load(rel, paths)
                    .with_context(|| format!("loading overlays for /{}", rel.display()))
            })
            .collect()
    }
}

/// Turn a command-line target into a path relative to `root`.
///
/// Absolute paths must lie under `root`; relative paths are taken as
/// already relative to it.
///
/// # Errors
///
/// Returns an error for paths outside `root`, paths with `..`, or the root
/// itself.
pub fn resolve_target(root: &Path, arg: &Path) -> Result<PathBuf> {
    let rel = if arg.is_absolute() {
        arg.strip_prefix(root)
            .with_context(|| format!("{} is not under root {}", arg.display(), root.display()))?
    } else {
        arg
    };
    if rel.components().any(|c| matches!(c, Component::ParentDir)) {
        anyhow::bail!("target {} must not contain '..'", arg.display());
    }
    let rel: PathBuf = rel
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    if rel.as_os_str().is_empty() {
        anyhow::bail!("target {} names the root itself", arg.display());
    }
    Ok(rel)
}

/// Run `work` for every target, each with its own [`ReportSink`].
///
/// Results come back in target order whether or not they ran in parallel.
pub fn run_targets<T, F>(targets: &[TargetFile], parallel: bool, work: F) -> Vec<(T, ReportSink)>
where
    T: Send,
    F: Fn(&TargetFile, &mut ReportSink) -> T + Sync + Send,
{
    let run_one = |target: &TargetFile| {
        let mut sink = ReportSink::new();
        let result = work(target, &mut sink);
        (result, sink)
    };
    if parallel {
        use rayon::prelude::*;
        targets.par_iter().map(run_one).collect()
    } else {
        targets.iter().map(run_one).collect()
    }
}
