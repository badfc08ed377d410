//! Tool configuration shared by the preprocess and instrument phases.
//!
//! Stored as `conf.toml` in the workspace root so that it survives the
//! scratch-directory reset at the start of every build:
//!
//! ```toml
//! verbose = true
//! rule_json_files = "custom.json"
//! disable_default_rules = false
//! ```
//!
//! Layering is file → environment. `OTEL_VERBOSE` and
//! `OTEL_RULE_JSON_FILES` override the file when set.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::ConfigError;

pub const VERBOSE_ENV: &str = "OTEL_VERBOSE";
pub const RULE_JSON_FILES_ENV: &str = "OTEL_RULE_JSON_FILES";

/// Version reported by `otel version` and the fatal report.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compiler that built this binary, captured by the build script.
pub const RUSTC_VERSION: &str = env!("OTEL_RUSTC_VERSION");

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Log at debug level
    #[serde(default)]
    pub verbose: bool,
    /// Comma-separated list of rule files supplied by the user
    #[serde(default)]
    pub rule_json_files: Option<String>,
    /// Skip the built-in rule set
    #[serde(default)]
    pub disable_default_rules: bool,
}

impl ToolConfig {
    /// Load from `path`, returning defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path` and apply environment overrides.
    pub fn load_layered(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(VERBOSE_ENV) {
            self.verbose = parse_bool(&v);
        }
        if let Some(v) = lookup(RULE_JSON_FILES_ENV) {
            self.rule_json_files = if v.is_empty() { None } else { Some(v) };
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|source| ConfigError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Rule files as a list, empty entries dropped.
    pub fn rule_files(&self) -> Vec<&str> {
        self.rule_json_files
            .as_deref()
            .map(|files| {
                files
                    .split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
