#![cfg(unix)]
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for the `apply` command.
//!
//! These tests run [`commands::apply::run`] against isolated temporary
//! roots and verify installed contents, state bookkeeping, drift handling,
//! dry runs, and failure reporting.

mod common;

use strata_cli::cli::ApplyOpts;
use strata_cli::commands;
use strata_cli::logging::Logger;

fn apply(ctx: &common::IntegrationTestContext, opts: &ApplyOpts) -> anyhow::Result<()> {
    let log = Logger::with_log_file(None);
    commands::apply::run(&ctx.global(true), opts, &log, &ctx.cancel)
}

#[test]
fn apply_installs_all_discovered_targets() {
    let ctx = common::TestContextBuilder::new()
        .with_live("etc/motd", "welcome\n")
        .with_script("10-base", "etc/motd", "tr a-z A-Z\n")
        .with_overlay("10-base", "etc/issue", "strata managed\n")
        .build();

    apply(&ctx, &ApplyOpts::default()).unwrap();

    assert_eq!(ctx.read_live("etc/motd"), "WELCOME\n");
    assert_eq!(ctx.read_live("etc/issue"), "strata managed\n");
    let state = &ctx.paths.state_dir;
    assert_eq!(std::fs::read_to_string(state.join("base/etc/motd")).unwrap(), "welcome\n");
    assert_eq!(std::fs::read_to_string(state.join("provisioned/etc/motd")).unwrap(), "WELCOME\n");
    assert!(!state.join("base/etc/issue").exists());
}

#[test]
fn reapply_is_idempotent() {
    let ctx = common::TestContextBuilder::new()
        .with_live("etc/motd", "welcome\n")
        .with_script("10-base", "etc/motd", "cat\necho footer\n")
        .build();

    apply(&ctx, &ApplyOpts::default()).unwrap();
    apply(&ctx, &ApplyOpts::default()).unwrap();
    assert_eq!(ctx.read_live("etc/motd"), "welcome\nfooter\n");
}

#[test]
fn named_target_limits_the_run() {
    let ctx = common::TestContextBuilder::new()
        .with_overlay("10-base", "etc/motd", "motd\n")
        .with_overlay("10-base", "etc/issue", "issue\n")
        .build();
    let opts = ApplyOpts {
        targets: vec![ctx.live("etc/issue")],
        ..ApplyOpts::default()
    };

    apply(&ctx, &opts).unwrap();
    assert_eq!(ctx.read_live("etc/issue"), "issue\n");
    assert!(!ctx.live("etc/motd").exists());
}

#[test]
fn dry_run_writes_nothing() {
    let ctx = common::TestContextBuilder::new()
        .with_overlay("10-base", "etc/motd", "motd\n")
        .build();
    let opts = ApplyOpts {
        dry_run: true,
        ..ApplyOpts::default()
    };
    apply(&ctx, &opts).unwrap();
    assert!(!ctx.live("etc/motd").exists());
    assert!(!ctx.paths.state_dir.exists());
}

#[test]
fn drift_is_preserved_until_forced() {
    let ctx = common::TestContextBuilder::new()
        .with_overlay("10-base", "etc/motd", "managed\n")
        .build();
    apply(&ctx, &ApplyOpts::default()).unwrap();
    std::fs::write(ctx.live("etc/motd"), "hand edit\n").unwrap();

    apply(&ctx, &ApplyOpts::default()).unwrap();
    assert_eq!(ctx.read_live("etc/motd"), "hand edit\n");

    let force = ApplyOpts {
        force: true,
        ..ApplyOpts::default()
    };
    apply(&ctx, &force).unwrap();
    assert_eq!(ctx.read_live("etc/motd"), "managed\n");
}

#[test]
fn failing_target_does_not_stop_the_others() {
    let ctx = common::TestContextBuilder::new()
        .with_live("etc/broken", "keep me\n")
        .with_script("10-base", "etc/broken", "exit 3\n")
        .with_overlay("10-base", "etc/motd", "motd\n")
        .build();

    let err = apply(&ctx, &ApplyOpts::default()).unwrap_err();
    assert_eq!(err.to_string(), "1 target(s) failed");
    assert_eq!(ctx.read_live("etc/broken"), "keep me\n");
    assert_eq!(ctx.read_live("etc/motd"), "motd\n");
}

#[test]
fn sequential_run_matches_parallel_run() {
    let build = || {
        common::TestContextBuilder::new()
            .with_live("etc/a", "a\n")
            .with_script("10-base", "etc/a", "cat\necho 1\n")
            .with_overlay("10-base", "etc/b", "b\n")
            .with_script("20-site", "etc/b", "cat\necho 2\n")
            .build()
    };
    let parallel = build();
    let sequential = build();
    apply(&parallel, &ApplyOpts::default()).unwrap();
    let log = Logger::with_log_file(None);
    commands::apply::run(&sequential.global(false), &ApplyOpts::default(), &log, &sequential.cancel).unwrap();

    for rel in ["etc/a", "etc/b"] {
        assert_eq!(parallel.read_live(rel), sequential.read_live(rel));
    }
    assert_eq!(sequential.read_live("etc/b"), "b\n2\n");
}
