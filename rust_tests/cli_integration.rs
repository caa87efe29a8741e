//! CLI Integration Tests
//!
//! Tests for:
//! - CLI flag recognition (--format, --root, -v)
//! - JSON output format of the built binary
//! - Reporter trait implementations

use clap::Parser;
use std::fs;
use std::process::{Command, Stdio};
use tach_map::config::{Cli, Commands, OutputFormat};
use tach_map::reporter::{HumanReporter, JsonReporter, MultiReporter, Reporter};
use tempfile::TempDir;

/// Run the built tach-map binary with given args
fn run_tach_map(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_tach-map"))
        .args(args)
        .env_remove("TACH_FORMAT")
        .env_remove("TACH_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute tach-map")
}

/// Test output format enum variants
#[test]
fn test_output_format_variants() {
    assert_ne!(OutputFormat::Human, OutputFormat::Json);
    assert_eq!(OutputFormat::default(), OutputFormat::Human);
}

#[test]
fn test_cli_defaults() {
    let cli = Cli::try_parse_from(["tach-map"]).unwrap();
    assert_eq!(cli.root.to_str(), Some("."));
    assert!(cli.vars.is_empty());
    assert!(cli.command.is_none());
}

#[test]
fn test_cli_repeated_vars_and_subcommand() {
    let cli = Cli::try_parse_from([
        "tach-map", "--format", "json", "-v", "a=1", "--var", "b=2", "env",
    ])
    .unwrap();
    assert_eq!(cli.format, OutputFormat::Json);
    assert_eq!(cli.vars, vec!["a=1", "b=2"]);
    assert_eq!(cli.command, Some(Commands::Env));
}

/// Test MultiReporter accepts boxed reporters
#[test]
fn test_multi_reporter_creation() {
    let reporters: Vec<Box<dyn Reporter>> = vec![Box::new(HumanReporter), Box::new(JsonReporter)];
    let _ = MultiReporter::new(reporters);
}

#[test]
fn test_binary_dumps_vars_as_json_in_key_order() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("pyproject.toml"),
        r#"
[tool.tach.vars]
zeta = "file"
alpha = "file"
"#,
    )
    .unwrap();

    let output = run_tach_map(&[
        "--format",
        "json",
        "--root",
        temp.path().to_str().unwrap(),
        "-v",
        "zeta=cli",
        "vars",
    ]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout must be pure NDJSON"))
        .collect();

    assert_eq!(events.len(), 4);
    assert_eq!(events[0]["event"], "dump_start");
    assert_eq!(events[0]["count"], 2);
    assert_eq!(events[1]["key"], "alpha");
    assert_eq!(events[1]["value"], "file");
    assert_eq!(events[2]["key"], "zeta");
    assert_eq!(events[2]["value"], "cli");
    assert_eq!(events[3]["event"], "dump_finished");
}

#[test]
fn test_binary_reports_bad_assignment() {
    let temp = TempDir::new().unwrap();
    let output = run_tach_map(&[
        "--format",
        "json",
        "--root",
        temp.path().to_str().unwrap(),
        "-v",
        "broken",
    ]);
    assert!(!output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let event: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(event["event"], "error");
    assert!(event["message"].as_str().unwrap().contains("broken"));
}
