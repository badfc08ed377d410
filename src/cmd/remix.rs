//! Toolexec entry: `otel remix <tool> [args]`.
//!
//! Invoked by the go toolchain once per tool invocation (compile, asm,
//! link, ...). The wrapped tool runs with its arguments unchanged and
//! inherits stdio, which keeps `-V=full` build-ID queries working.

use std::path::Path;
use std::process::Command;

use otel::context::RunContext;
use otel::errors::{DiagnosticError, ToolError};

pub fn cmd_remix(ctx: &RunContext) -> Result<(), ToolError> {
    let (tool, tool_args) = ctx
        .args()
        .split_first()
        .ok_or_else(|| DiagnosticError::new("No tool specified for remix"))?;
    let name = tool_name(tool);

    if name == "compile" {
        if let Some(package) = flag_value(tool_args, "-p") {
            tracing::debug!("Compiling package {}", package);
        }
    }

    let status = Command::new(tool).args(tool_args).status().map_err(|e| {
        DiagnosticError::new(format!("Failed to run {}: {}", name, e)).with("tool", tool.as_str())
    })?;

    if !status.success() {
        let mut err = DiagnosticError::new(format!("{} exited with {}", name, status));
        err.attach("tool", tool.as_str());
        if let Some(code) = status.code() {
            err.attach("exitCode", code.to_string());
        }
        return Err(err.into());
    }
    Ok(())
}

/// The tool's file stem, e.g. `compile` for `/usr/lib/go/pkg/tool/linux_amd64/compile`.
fn tool_name(tool: &str) -> String {
    Path::new(tool)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| tool.to_string())
}

/// Value of `flag` given either as `flag value` or `flag=value`.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == flag {
            return iter.next().map(String::as_str);
        }
        if let Some(value) = arg.strip_prefix(flag).and_then(|rest| rest.strip_prefix('=')) {
            return Some(value);
        }
    }
    None
}
