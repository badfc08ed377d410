//! Fatal report rendering.
//!
//! The report is the single user-facing failure text for every subcommand
//! except `remix`. It is assembled only when a failure actually happens.

use std::path::{Path, PathBuf};

use crate::config::{RUSTC_VERSION, TOOL_VERSION};
use crate::context::RunContext;
use crate::errors::ToolError;

const LABEL_WIDTH: usize = 11;

/// Facts about the invocation printed in the environment block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    pub command: String,
    pub log_path: PathBuf,
    pub work_dir: String,
    pub toolchain: String,
}

impl InvocationContext {
    /// Capture the invocation facts from the run context and `PWD`.
    pub fn capture(ctx: &RunContext) -> Self {
        Self::new(ctx.command_line(), &ctx.log_path())
    }

    pub fn new(command: impl Into<String>, log_path: &Path) -> Self {
        Self {
            command: command.into(),
            log_path: log_path.to_path_buf(),
            work_dir: std::env::var("PWD").unwrap_or_default(),
            toolchain: toolchain_identity(),
        }
    }
}

/// `os/arch, rustc version, tool version`
pub fn toolchain_identity() -> String {
    format!(
        "{}/{}, {}, {}",
        std::env::consts::OS,
        std::env::consts::ARCH,
        RUSTC_VERSION,
        TOOL_VERSION
    )
}

fn line(label: &str, value: &str) -> String {
    format!("{:<width$}: {}\n", label, value, width = LABEL_WIDTH)
}

/// Render the fatal report for `err`.
///
/// Environment block, then one line per diagnostic detail, then the
/// reason alone. The backtrace is never included.
pub fn render(invocation: &InvocationContext, err: &ToolError) -> String {
    let mut message = String::from("===== Environments =====\n");
    message.push_str(&line("command", &invocation.command));
    message.push_str(&line("errorLog", &invocation.log_path.display().to_string()));
    message.push_str(&line("workDir", &invocation.work_dir));
    message.push_str(&line("toolchain", &invocation.toolchain));

    if let Some(diag) = err.diagnostic() {
        let mut details: Vec<_> = diag.details().iter().collect();
        details.sort();
        for (key, value) in details {
            message.push_str(&line(key, value));
        }
    }

    message.push_str("\n===== Fatal Error ======\n");
    message.push('\n');
    message.push_str(&err.summary());
    message
}
