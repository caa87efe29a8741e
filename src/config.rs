//! Configuration Loader
//! - Reads pyproject.toml for configuration variables and environment overrides
//! - Provides CLI argument parsing with clap

use crate::vars::Vars;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// =============================================================================
// CLI Configuration
// =============================================================================

/// Output format for dumps
#[derive(ValueEnum, Clone, Debug, Default, PartialEq)]
pub enum OutputFormat {
    /// Human-readable output (to stderr)
    #[default]
    Human,
    /// Machine-readable NDJSON (to stdout)
    Json,
}

/// tach-map CLI - inspect test configuration and environment
#[derive(Parser, Debug)]
#[command(
    name = "tach-map",
    version,
    about = "Inspect tach configuration variables and test environment"
)]
pub struct Cli {
    /// Output format (also: TACH_FORMAT env var)
    #[arg(long, value_enum, default_value_t = OutputFormat::Human, env = "TACH_FORMAT")]
    pub format: OutputFormat,

    /// Project root containing pyproject.toml
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Set a configuration variable (NAME=VALUE), may be repeated
    #[arg(short = 'v', long = "var", value_name = "NAME=VALUE")]
    pub vars: Vec<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands
#[derive(Subcommand, Clone, Debug, PartialEq)]
pub enum Commands {
    /// Dump resolved configuration variables (default)
    Vars,
    /// Dump the effective test environment
    Env,
}

// =============================================================================
// PyProject Configuration
// =============================================================================

#[derive(Deserialize, Default)]
struct PyProject {
    tool: Option<ToolConfig>,
}

#[derive(Deserialize, Default)]
struct ToolConfig {
    tach: Option<TachConfig>,
    pytest_env: Option<BTreeMap<String, String>>,
}

#[derive(Deserialize, Default)]
struct TachConfig {
    vars: Option<BTreeMap<String, String>>,
}

/// Parse pyproject.toml under `root`. A missing file is an empty project.
fn read_pyproject(root: &Path) -> Result<PyProject> {
    let config_path = root.join("pyproject.toml");
    if !config_path.exists() {
        debug!(path = %config_path.display(), "no pyproject.toml");
        return Ok(PyProject::default());
    }

    let contents = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    toml::from_str(&contents).with_context(|| format!("Failed to parse {}", config_path.display()))
}

fn table_to_vars(table: Option<BTreeMap<String, String>>) -> Result<Vars> {
    let mut vars = Vars::new();
    for (name, value) in table.unwrap_or_default() {
        if name.is_empty() {
            warn!("Ignoring variable with empty name in pyproject.toml");
            continue;
        }
        vars.set(&name, value)?;
    }
    Ok(vars)
}

/// Load `[tool.tach.vars]` from pyproject.toml
pub fn load_vars_from_pyproject(root: &Path) -> Result<Vars> {
    let pyproject = read_pyproject(root)?;
    table_to_vars(pyproject.tool.and_then(|tool| tool.tach).and_then(|tach| tach.vars))
}

/// Load `[tool.pytest_env]` from pyproject.toml
pub fn load_env_overrides(root: &Path) -> Result<Vars> {
    let pyproject = read_pyproject(root)?;
    table_to_vars(pyproject.tool.and_then(|tool| tool.pytest_env))
}

/// Configuration variables from pyproject.toml, overridden by `-v` flags
pub fn resolve_vars(cli: &Cli) -> Result<Vars> {
    let mut vars = load_vars_from_pyproject(&cli.root)?;
    let overrides = Vars::from_assignments(&cli.vars)?;
    vars.merge(&overrides)?;
    Ok(vars)
}

// =============================================================================
// Unit Tests
// =============================================================================
