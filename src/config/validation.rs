//! Sanity checks on a loaded [`Config`].
use super::Config;

/// A validation warning detected during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The configuration key that triggered the warning (e.g. `"paths.root"`).
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Create a new warning.
    #[must_use]
    pub fn new(item: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            message: message.into(),
        }
    }
}

/// Check `config` for values that load fine but will misbehave at run time.
#[must_use]
pub fn validate(config: &Config) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    for (item, path) in [
        ("paths.root", &config.paths.root),
        ("paths.resource_dir", &config.paths.resource_dir),
        ("paths.state_dir", &config.paths.state_dir),
    ] {
        if path.is_relative() {
            warnings.push(ValidationWarning::new(
                item,
                format!("{} is relative to the working directory", path.display()),
            ));
        }
    }

    if config.paths.state_dir.starts_with(&config.paths.resource_dir) {
        warnings.push(ValidationWarning::new(
            "paths.state_dir",
            "state directory lies inside the resource directory and will be scanned for overlays",
        ));
    }

    if config.exec.script_timeout_secs == 0 {
        warnings.push(ValidationWarning::new(
            "exec.script_timeout_secs",
            "zero timeout: every passthru script will time out",
        ));
    }

    if config.exec.diff_timeout_secs == 0 {
        warnings.push(ValidationWarning::new(
            "exec.diff_timeout_secs",
            "zero timeout: every diff will time out",
        ));
    }

    if !crate::exec::which(&config.exec.diff_program) {
        warnings.push(ValidationWarning::new(
            "exec.diff_program",
            format!("'{}' not found on PATH", config.exec.diff_program),
        ));
    }

    if config.symlinks.max_hops == 0 {
        warnings.push(ValidationWarning::new(
            "symlinks.max_hops",
            "zero hops: every symlink overlay will be treated as dangling",
        ));
    }

    warnings
}
