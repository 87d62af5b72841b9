//! Layered configuration file provisioning.
//!
//! A target file such as `/etc/ssh/sshd_config` is produced by folding an
//! ordered list of overlays over its original contents.  Each overlay either
//! replaces the contents outright or pipes them through an executable
//! *passthru* script.  The result is installed atomically and remembered, so
//! later runs can detect manual edits and show diffs.
//!
//! The public API is organised into four layers:
//!
//! - **[`config`]** — load and validate `strata.toml`
//! - **[`files`]** — buffers, overlay discovery, the apply pipeline, diffs, target state
//! - **[`report`]** — per-action diagnostics collected while targets are processed
//! - **[`commands`]** — top-level subcommand orchestration (`apply`, `diff`, `scan`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod files;
pub mod logging;
pub mod report;
