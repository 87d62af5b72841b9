#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for the `scan` command and overlay discovery.

mod common;

use std::path::PathBuf;

use strata_cli::cli::ScanOpts;
use strata_cli::commands;
use strata_cli::files::repo;
use strata_cli::logging::Logger;

fn scan(ctx: &common::IntegrationTestContext, json: bool) -> String {
    let log = Logger::with_log_file(None);
    let mut out = Vec::new();
    commands::scan::run(&ctx.global(true), &ScanOpts { json }, &log, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

fn sample() -> common::IntegrationTestContext {
    common::TestContextBuilder::new()
        .with_overlay("10-base", "etc/motd", "base\n")
        .with_script("20-site", "etc/motd", "cat\n")
        .with_script("10-base", "etc/ssh/sshd_config", "cat\n")
        .build()
}

#[test]
fn discovery_lists_each_target_once() {
    let ctx = sample();
    let targets: Vec<PathBuf> = repo::discover_targets(&ctx.paths.resource_dir)
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(
        targets,
        vec![PathBuf::from("etc/motd"), PathBuf::from("etc/ssh/sshd_config")]
    );
}

#[test]
fn text_output_lists_overlays_in_application_order() {
    let ctx = sample();
    let res = ctx.paths.resource_dir.display().to_string();
    let out = scan(&ctx, false).replace(&res, "<res>");
    insta::assert_snapshot!(out.trim_end(), @r"
    /etc/motd
        apply    <res>/10-base/etc/motd (10-base)
        passthru <res>/20-site/etc/motd.passthru (20-site)
    /etc/ssh/sshd_config
        passthru <res>/10-base/etc/ssh/sshd_config.passthru (10-base)
    ");
}

#[test]
fn json_output_round_trips_through_serde() {
    let ctx = sample();
    let value: serde_json::Value = serde_json::from_str(&scan(&ctx, true)).unwrap();
    let entries = value.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["target"], "/etc/motd");
    assert_eq!(entries[0]["overlays"].as_array().unwrap().len(), 2);
    assert_eq!(entries[1]["overlays"][0]["strategy"], "passthru");
}

#[test]
fn missing_resource_dir_is_an_error() {
    let ctx = common::IntegrationTestContext::new();
    std::fs::remove_dir(&ctx.paths.resource_dir).unwrap();
    let log = Logger::with_log_file(None);
    let mut out = Vec::new();
    let err = commands::scan::run(&ctx.global(true), &ScanOpts::default(), &log, &mut out).unwrap_err();
    assert!(format!("{err:#}").contains("scanning"));
}
