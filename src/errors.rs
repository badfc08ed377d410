//! Error types for the otel orchestrator.
//!
//! - `DiagnosticError`: a reason, the backtrace captured at creation and a
//!   key/value context map that grows as the error travels upward
//! - `ToolError`: what every handler returns: diagnostic or opaque
//! - `ConfigError`: failures reading or writing `conf.toml`

use std::backtrace::Backtrace;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// An error that carries its own diagnostic context.
///
/// `reason` and `cause` are fixed at construction. Only `details` changes,
/// and only through [`DiagnosticError::attach`]. Callers must serialize
/// concurrent `attach` calls on one instance themselves.
#[derive(Debug, Error)]
#[error("{reason}\n{cause}")]
pub struct DiagnosticError {
    reason: String,
    cause: String,
    details: HashMap<String, String>,
}

impl DiagnosticError {
    /// Create an error, capturing the current call stack as its cause.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            cause: Backtrace::force_capture().to_string(),
            details: HashMap::new(),
        }
    }

    /// Builder form of [`attach`](Self::attach).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attach(key, value);
        self
    }

    /// Insert or replace a context entry.
    pub fn attach(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn cause(&self) -> &str {
        &self.cause
    }

    pub fn details(&self) -> &HashMap<String, String> {
        &self.details
    }
}

/// The error returned by handlers and start-up steps.
///
/// Only the `Diagnostic` variant accepts annotation; `Opaque` values pass
/// through every enrichment step untouched.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Diagnostic(Box<DiagnosticError>),

    #[error(transparent)]
    Opaque(#[from] anyhow::Error),
}

impl ToolError {
    /// The diagnostic payload, if this error carries one.
    pub fn diagnostic(&self) -> Option<&DiagnosticError> {
        match self {
            ToolError::Diagnostic(diag) => Some(diag),
            ToolError::Opaque(_) => None,
        }
    }

    /// Attach context when supported. See [`annotate`].
    pub fn annotate(self, key: &str, value: &str) -> Self {
        annotate(self, key, value)
    }

    /// The user-facing summary line: the reason without the backtrace.
    pub fn summary(&self) -> String {
        match self {
            ToolError::Diagnostic(diag) => diag.reason().to_string(),
            ToolError::Opaque(err) => err.to_string(),
        }
    }
}

impl From<DiagnosticError> for ToolError {
    fn from(err: DiagnosticError) -> Self {
        ToolError::Diagnostic(Box::new(err))
    }
}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        ToolError::Opaque(err.into())
    }
}

impl From<ConfigError> for ToolError {
    fn from(err: ConfigError) -> Self {
        let path = err.path().display().to_string();
        DiagnosticError::new(err.to_string())
            .with("config", path)
            .into()
    }
}

/// Best-effort enrichment: a diagnostic error gains the entry in place and
/// is returned as the same value, anything else is returned unchanged.
pub fn annotate(err: ToolError, key: &str, value: &str) -> ToolError {
    match err {
        ToolError::Diagnostic(mut diag) => {
            diag.attach(key, value);
            ToolError::Diagnostic(diag)
        }
        opaque @ ToolError::Opaque(_) => opaque,
    }
}

/// Annotate the error side of a result while propagating it with `?`.
pub trait ResultExt<T> {
    fn annotate(self, key: &str, value: &str) -> Result<T, ToolError>;
}

impl<T> ResultExt<T> for Result<T, ToolError> {
    fn annotate(self, key: &str, value: &str) -> Result<T, ToolError> {
        self.map_err(|err| annotate(err, key, value))
    }
}

/// Errors from loading or saving the tool configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },

    #[error("Failed to write config file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Serialize { path, .. }
            | ConfigError::Write { path, .. } => path,
        }
    }
}
