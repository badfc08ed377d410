//! Configuration updates: `otel set`.
//!
//! Flags merge into the existing `conf.toml`; a flag that is not given
//! leaves its setting unchanged.

use clap::Parser;
use std::path::Path;

use otel::config::ToolConfig;
use otel::context::RunContext;
use otel::errors::{DiagnosticError, ToolError};

use super::parse_flags;

#[derive(Parser, Debug)]
#[command(name = "set", disable_version_flag = true)]
struct SetArgs {
    /// Log at debug level during builds
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    verbose: Option<bool>,

    /// Comma-separated rule files; an empty value clears them
    #[arg(long)]
    rule: Option<String>,

    /// Skip the built-in rule set
    #[arg(long = "disable_default", num_args = 0..=1, default_missing_value = "true")]
    disable_default: Option<bool>,
}

pub fn cmd_set(ctx: &RunContext) -> Result<(), ToolError> {
    let Some(args) = parse_flags::<SetArgs>("set", ctx)? else {
        return Ok(());
    };

    let path = ctx.workspace().config_path();
    let mut config = ToolConfig::load(&path)?;

    if let Some(verbose) = args.verbose {
        config.verbose = verbose;
    }
    if let Some(rule) = args.rule {
        config.rule_json_files = resolve_rule_files(&rule)?;
    }
    if let Some(disable) = args.disable_default {
        config.disable_default_rules = disable;
    }

    config.save(&path)?;
    tracing::info!("Saved configuration to {}", path.display());
    println!("Configured in {}", path.display());
    Ok(())
}

/// Validate each rule file and return them as absolute paths.
fn resolve_rule_files(rule: &str) -> Result<Option<String>, ToolError> {
    let files: Vec<&str> = rule
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();
    if files.is_empty() {
        return Ok(None);
    }

    let mut resolved = Vec::with_capacity(files.len());
    for file in files {
        let path = validate_rule_file(Path::new(file))?;
        resolved.push(path);
    }
    Ok(Some(resolved.join(",")))
}

/// A rule file must exist and hold a JSON array.
fn validate_rule_file(path: &Path) -> Result<String, ToolError> {
    let rule_err = |reason: String| DiagnosticError::new(reason).with("rule", path.display().to_string());

    let absolute = std::fs::canonicalize(path)
        .map_err(|e| rule_err(format!("Failed to locate rule file: {}", e)))?;
    let content = std::fs::read_to_string(&absolute)
        .map_err(|e| rule_err(format!("Failed to read rule file: {}", e)))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| rule_err(format!("Failed to parse rule file: {}", e)))?;
    if !value.is_array() {
        return Err(rule_err("Rule file must contain a JSON array of rules".to_string()).into());
    }

    Ok(absolute.display().to_string())
}
