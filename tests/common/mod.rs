// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed system root, overlay repository, and
// state directory, plus a fluent builder so each integration test can set up
// an isolated environment without repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use strata_cli::cli::GlobalOpts;
use strata_cli::config::{Config, PathsConfig};
use strata_cli::files::TargetFile;

/// An isolated managed root, resource directory, and state directory backed
/// by a [`tempfile::TempDir`].
///
/// The directory is automatically deleted when dropped.
pub struct IntegrationTestContext {
    /// Temporary directory holding everything below.
    pub dir: tempfile::TempDir,
    /// Paths handed to the engine.
    pub paths: PathsConfig,
    /// Cancellation flag for [`strata_cli::files::Env`].
    pub cancel: AtomicBool,
}

impl IntegrationTestContext {
    /// Create a context with empty `root/`, `resources/`, and `state/`
    /// directories, and a `strata.toml` pointing at them.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let paths = PathsConfig {
            root: dir.path().join("root"),
            resource_dir: dir.path().join("resources"),
            state_dir: dir.path().join("state"),
        };
        std::fs::create_dir_all(&paths.root).expect("create root");
        std::fs::create_dir_all(&paths.resource_dir).expect("create resources");
        let toml = format!(
            "[paths]\nroot = {:?}\nresource_dir = {:?}\nstate_dir = {:?}\n\n[exec]\nscript_timeout_secs = 10\n",
            paths.root.display().to_string(),
            paths.resource_dir.display().to_string(),
            paths.state_dir.display().to_string(),
        );
        std::fs::write(dir.path().join("strata.toml"), toml).expect("write strata.toml");
        Self {
            dir,
            paths,
            cancel: AtomicBool::new(false),
        }
    }

    /// Configuration equivalent to the written `strata.toml`.
    pub fn config(&self) -> Config {
        Config::load(&self.config_path()).expect("load config")
    }

    /// Path of the generated `strata.toml`.
    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("strata.toml")
    }

    /// Global CLI options pointing at this context.
    pub fn global(&self, parallel: bool) -> GlobalOpts {
        GlobalOpts {
            config: Some(self.config_path()),
            root: None,
            parallel,
        }
    }

    /// The live path of a target.
    pub fn live(&self, rel: &str) -> PathBuf {
        self.paths.root.join(rel)
    }

    /// Read a live target as text.
    pub fn read_live(&self, rel: &str) -> String {
        std::fs::read_to_string(self.live(rel)).expect("read live target")
    }

    /// Load a target with its discovered overlays.
    pub fn target(&self, rel: &str) -> TargetFile {
        TargetFile::load(Path::new(rel), &self.paths).expect("load target")
    }

    /// A path inside the temp dir for scripts to write side-channel output.
    pub fn scratch(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Fluent builder for [`IntegrationTestContext`].
pub struct TestContextBuilder {
    ctx: IntegrationTestContext,
}

impl TestContextBuilder {
    /// Begin building a new, empty context.
    pub fn new() -> Self {
        Self {
            ctx: IntegrationTestContext::new(),
        }
    }

    /// Continue building on an existing context, e.g. once its scratch paths
    /// are known.
    pub fn from_context(ctx: IntegrationTestContext) -> Self {
        Self { ctx }
    }

    /// Write a replace overlay `resources/<layer>/<rel>`.
    pub fn with_overlay(self, layer: &str, rel: &str, content: &str) -> Self {
        write_file(&self.ctx.paths.resource_dir.join(layer).join(rel), content);
        self
    }

    /// Write an executable passthru overlay `resources/<layer>/<rel>.passthru`.
    pub fn with_script(self, layer: &str, rel: &str, body: &str) -> Self {
        let path = self
            .ctx
            .paths
            .resource_dir
            .join(layer)
            .join(format!("{rel}.passthru"));
        write_file(&path, &format!("#!/bin/sh\n{body}"));
        make_executable(&path);
        self
    }

    /// Write the live target `root/<rel>`.
    pub fn with_live(self, rel: &str, content: &str) -> Self {
        write_file(&self.ctx.live(rel), content);
        self
    }

    /// Create `root/<rel>` as a symlink to `dest`.
    #[cfg(unix)]
    pub fn with_live_symlink(self, rel: &str, dest: &str) -> Self {
        let path = self.ctx.live(rel);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
        std::os::unix::fs::symlink(dest, path).expect("create symlink");
        self
    }

    /// Finish building and return the configured context.
    pub fn build(self) -> IntegrationTestContext {
        self.ctx
    }
}

fn write_file(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
    std::fs::write(path, content).expect("write file");
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt as _;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}
