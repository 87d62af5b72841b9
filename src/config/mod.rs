//! Engine configuration loaded from `strata.toml`.
pub mod toml_loader;
pub mod validation;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/strata.toml";

/// All engine configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Filesystem locations.
    pub paths: PathsConfig,
    /// External program settings.
    pub exec: ExecConfig,
    /// Symlink resolution settings.
    pub symlinks: SymlinkConfig,
}

/// Where targets, overlays and state live.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Root of the managed filesystem; targets are relative to it.
    pub root: PathBuf,
    /// Directory containing the ordered overlay layers.
    pub resource_dir: PathBuf,
    /// Directory holding base snapshots and provisioned copies.
    pub state_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
            resource_dir: PathBuf::from("/usr/share/strata/files"),
            state_dir: PathBuf::from("/var/lib/strata/files"),
        }
    }
}

/// Timeouts and programs for external invocations.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ExecConfig {
    /// Upper bound for a single passthru script run.
    pub script_timeout_secs: u64,
    /// Upper bound for a single diff invocation.
    pub diff_timeout_secs: u64,
    /// Program used to render unified diffs.
    pub diff_program: String,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            script_timeout_secs: 60,
            diff_timeout_secs: 30,
            diff_program: "diff".to_string(),
        }
    }
}

impl ExecConfig {
    /// Script timeout as a [`Duration`].
    #[must_use]
    pub const fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.script_timeout_secs)
    }

    /// Diff timeout as a [`Duration`].
    #[must_use]
    pub const fn diff_timeout(&self) -> Duration {
        Duration::from_secs(self.diff_timeout_secs)
    }
}

/// Symlink resolution limits.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SymlinkConfig {
    /// Maximum number of links followed before a chain counts as dangling.
    pub max_hops: usize,
}

impl Default for SymlinkConfig {
    fn default() -> Self {
        Self { max_hops: 20 }
    }
}

impl Config {
    /// Load configuration from `path`, falling back to defaults for a
    /// missing file or missing keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        toml_loader::load_config(path)
    }

    /// Replace the managed root, e.g. from a `--root` flag.
    #[must_use]
    pub fn with_root(mut self, root: PathBuf) -> Self {
        self.paths.root = root;
        self
    }

    /// Validate the configuration and return any warnings found.
    #[must_use]
    pub fn validate(&self) -> Vec<validation::ValidationWarning> {
        validation::validate(self)
    }
}

/// Resolve the configuration file path from an explicit flag, the
/// `STRATA_CONFIG` environment variable, or [`DEFAULT_CONFIG_PATH`].
#[must_use]
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    std::env::var_os("STRATA_CONFIG").map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}
