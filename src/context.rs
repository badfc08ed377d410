//! The per-process run context handed to every handler.
//!
//! Built once at start-up, before any handler runs, and passed by
//! reference from then on. It replaces process-wide globals for the run
//! phase, the workspace location and the loaded configuration.

use std::path::{Path, PathBuf};

use crate::config::ToolConfig;
use crate::errors::{DiagnosticError, ToolError};
use crate::phase::{PHASE_ENV, RunPhase, resolve_phase};
use crate::workspace::TempWorkspace;

#[derive(Debug, Clone)]
pub struct RunContext {
    program: String,
    /// Arguments after the program name, subcommand first
    args: Vec<String>,
    phase: RunPhase,
    workspace: TempWorkspace,
    config: ToolConfig,
}

impl RunContext {
    /// Create a context without touching the filesystem or environment.
    pub fn new(program: impl Into<String>, args: Vec<String>, workspace: TempWorkspace) -> Self {
        Self {
            program: program.into(),
            args,
            phase: RunPhase::Unset,
            workspace,
            config: ToolConfig::default(),
        }
    }

    /// Build the context for this process from its arguments and
    /// environment.
    ///
    /// The phase comes from `args`; an `OTEL_RUN_PHASE` signal that
    /// disagrees with them is ignored. The workspace is located relative to the
    /// current directory unless `OTEL_BUILD_DIR` is set. Nothing is
    /// created yet; see [`prepare`](Self::prepare).
    pub fn from_env(program: impl Into<String>, args: Vec<String>) -> Self {
        let signal = std::env::var(PHASE_ENV).ok();
        let phase = resolve_phase(&args, signal.as_deref());
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        let mut ctx = Self::new(program, args, TempWorkspace::locate(&cwd));
        ctx.set_phase(phase);
        ctx
    }

    /// Prepare the workspace for the current phase and load configuration.
    ///
    /// Configuration is only loaded for the preprocess and instrument
    /// phases.
    pub fn prepare(&mut self) -> Result<(), ToolError> {
        self.workspace.ensure(self.phase).map_err(|e| {
            DiagnosticError::new(format!("Failed to prepare temp build directory: {}", e))
                .with("buildDir", self.workspace.root().display().to_string())
        })?;

        if self.phase.is_build() {
            self.config = ToolConfig::load_layered(&self.workspace.config_path())?;
        }
        Ok(())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// The file name the tool was invoked as, used in usage text.
    pub fn tool_name(&self) -> String {
        tool_name(&self.program)
    }

    /// The subcommand token, if any.
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// Arguments following the subcommand, passed opaquely to handlers.
    pub fn args(&self) -> &[String] {
        self.args.get(1..).unwrap_or_default()
    }

    /// The full command line as invoked.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Later calls override earlier ones.
    pub fn set_phase(&mut self, phase: RunPhase) {
        self.phase = phase;
    }

    pub fn workspace(&self) -> &TempWorkspace {
        &self.workspace
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// Where this phase writes its log.
    pub fn log_path(&self) -> PathBuf {
        self.workspace.log_path(self.phase)
    }
}

/// File name component of `program`, or `otel` if it has none.
pub fn tool_name(program: &str) -> String {
    Path::new(program)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "otel".to_string())
}
