//! Build wrapper: `otel go <build|install> [args]`.
//!
//! Runs the go toolchain with `-toolexec` pointing back at this binary, so
//! every compiler tool invocation re-enters as `otel remix`.

use std::path::Path;
use std::process::Command;

use otel::context::RunContext;
use otel::errors::{DiagnosticError, ToolError};
use otel::phase::{PHASE_ENV, RunPhase, SUBCOMMAND_REMIX};

/// The go toolchain binary.
const GO: &str = "go";

/// Go subcommands that compile and therefore get `-toolexec`.
const COMPILING_SUBCOMMANDS: [&str; 2] = ["build", "install"];

pub fn cmd_go(ctx: &RunContext) -> Result<(), ToolError> {
    let user_command = format!("{} {}", GO, ctx.args().join(" "));
    if ctx.args().iter().any(|arg| is_toolexec_flag(arg)) {
        return Err(DiagnosticError::new("-toolexec is managed by otel and cannot be passed")
            .with("command", user_command)
            .into());
    }

    let exe = std::env::current_exe()
        .map_err(|e| DiagnosticError::new(format!("Failed to locate the otel executable: {}", e)))?;
    let invocation = inject_toolexec(ctx.args(), &exe)
        .map_err(|reason| DiagnosticError::new(reason).with("command", &user_command))?;
    let command_line = format!("{} {}", GO, invocation.args.join(" "));

    let rule_files = ctx.config().rule_files();
    if !rule_files.is_empty() {
        tracing::debug!("Using rule files: {}", rule_files.join(", "));
    }
    tracing::info!("Running {}", command_line);

    let mut command = Command::new(GO);
    command.args(&invocation.args);
    if invocation.instrumented {
        command
            .env(PHASE_ENV, RunPhase::Instrument.as_str())
            .env(
                otel::workspace::BUILD_DIR_ENV,
                ctx.workspace().root().as_os_str(),
            );
    }

    let status = command.status().map_err(|e| {
        DiagnosticError::new(format!("Failed to run {}: {}", GO, e))
            .with("command", &command_line)
            .with("stage", "spawn")
    })?;

    if !status.success() {
        let exit_code = status
            .code()
            .map(|code| code.to_string())
            .unwrap_or_else(|| "signal".to_string());
        return Err(DiagnosticError::new(format!("{} failed", command_line))
            .with("command", &command_line)
            .with("stage", "build")
            .with("exitCode", exit_code)
            .into());
    }

    tracing::info!("Build finished");
    Ok(())
}

/// The go command line to run, and whether it re-enters otel as `remix`.
#[derive(Debug, PartialEq, Eq)]
pub struct GoInvocation {
    pub args: Vec<String>,
    pub instrumented: bool,
}

/// `-toolexec`, `--toolexec` and their `=value` forms.
fn is_toolexec_flag(arg: &str) -> bool {
    let Some(name) = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-')) else {
        return false;
    };
    name == "toolexec" || name.starts_with("toolexec=")
}

/// Index of the go subcommand, skipping a leading `-C <dir>`.
///
/// Go accepts no other flag ahead of the subcommand.
fn subcommand_index(args: &[String]) -> Result<Option<usize>, String> {
    let mut idx = 0;
    while let Some(arg) = args.get(idx) {
        match arg.as_str() {
            "-C" | "--C" => {
                if args.get(idx + 1).is_none() {
                    return Err("go flag -C requires a directory".to_string());
                }
                idx += 2;
            }
            flag if flag.starts_with("-C=") || flag.starts_with("--C=") => idx += 1,
            flag if flag.starts_with('-') => {
                return Err(format!("Unsupported go flag before the subcommand: {}", flag));
            }
            _ => return Ok(Some(idx)),
        }
    }
    Ok(None)
}

/// Insert `-toolexec=<exe> remix` right after the go subcommand when it
/// compiles; other subcommands pass through unchanged.
pub fn inject_toolexec(args: &[String], exe: &Path) -> Result<GoInvocation, String> {
    let mut go_args = args.to_vec();
    let compiling = subcommand_index(&go_args)?
        .filter(|&idx| COMPILING_SUBCOMMANDS.contains(&go_args[idx].as_str()));
    if let Some(idx) = compiling {
        let flag = format!("-toolexec={} {}", quote(&exe.display().to_string()), SUBCOMMAND_REMIX);
        go_args.insert(idx + 1, flag);
    }
    Ok(GoInvocation {
        args: go_args,
        instrumented: compiling.is_some(),
    })
}

/// Quote a path for go's `-toolexec` word splitting.
fn quote(path: &str) -> String {
    if path.contains(char::is_whitespace) {
        format!("\"{}\"", path)
    } else {
        path.to_string()
    }
}
