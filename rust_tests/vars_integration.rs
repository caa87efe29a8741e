//! Integration tests for variable tables, config loading and environment overlay

use std::fs;
use tach_map::config::{load_env_overrides, load_vars_from_pyproject};
use tach_map::environment::overlay;
use tach_map::vars::{parse_assignment, Vars};
use tach_map::VarError;
use tempfile::TempDir;

#[test]
fn test_config_vars_from_pyproject() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("pyproject.toml"),
        r#"
[tool.tach.vars]
isolated = "yes"
pathfile = "/tmp/pathfile"
test = "foo bar"
"#,
    )
    .unwrap();

    let vars = load_vars_from_pyproject(temp.path()).unwrap();
    assert_eq!(vars.len(), 3);
    assert_eq!(vars.get("test"), Some("foo bar"));
    assert_eq!(vars.get_or("isolated", "no"), "yes");
    assert!(!vars.has("resfd"));

    let names: Vec<&str> = vars.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["isolated", "pathfile", "test"]);
}

#[test]
fn test_env_overrides_layer_over_captured() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("pyproject.toml"),
        r#"
[tool.pytest_env]
HOME = "/nonexistent"
EXTRA = "1"
"#,
    )
    .unwrap();

    let base = Vars::from_assignments(["HOME=/home/user", "PATH=/usr/bin"]).unwrap();
    let overrides = load_env_overrides(temp.path()).unwrap();
    let effective = overlay(&base, &overrides).unwrap();

    let pairs: Vec<(&str, &str)> = effective
        .iter()
        .map(|(name, value)| (name, value.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![("EXTRA", "1"), ("HOME", "/nonexistent"), ("PATH", "/usr/bin")]
    );
    assert!(!effective.find("PATH").is_managed());
    assert!(effective.find("HOME").is_managed());
}

#[test]
fn test_metadata_vars() {
    let mut md = Vars::new();
    md.set("ident", "map_insert").unwrap();
    md.set("descr", "Checks the insert operation").unwrap();
    md.set("isolated", "no").unwrap();

    assert_eq!(md.get("descr"), Some("Checks the insert operation"));
    let names: Vec<&str> = md.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["descr", "ident", "isolated"]);
}

#[test]
fn test_assignment_errors() {
    assert!(matches!(
        parse_assignment("missing"),
        Err(VarError::MissingSeparator(_))
    ));
    assert!(matches!(
        Vars::from_assignments(["ok=1", "=bad"]),
        Err(VarError::EmptyName(_))
    ));
}
