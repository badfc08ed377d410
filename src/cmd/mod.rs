//! Built-in subcommand handlers.
//!
//! | Module    | Subcommand | Phase      |
//! |-----------|------------|------------|
//! | `version` | `version`  | unset      |
//! | `set`     | `set`      | unset      |
//! | `go`      | `go`       | preprocess |
//! | `remix`   | `remix`    | instrument |

pub mod go;
pub mod remix;
pub mod set;
pub mod version;

pub use go::cmd_go;
pub use remix::cmd_remix;
pub use set::cmd_set;
pub use version::cmd_version;

use clap::Parser;
use clap::error::ErrorKind;

use otel::context::RunContext;
use otel::dispatch::Handlers;
use otel::errors::{DiagnosticError, ToolError};

pub struct DefaultHandlers;

impl Handlers for DefaultHandlers {
    fn version(&self, ctx: &RunContext) -> Result<(), ToolError> {
        cmd_version(ctx)
    }

    fn set(&self, ctx: &RunContext) -> Result<(), ToolError> {
        cmd_set(ctx)
    }

    fn go(&self, ctx: &RunContext) -> Result<(), ToolError> {
        cmd_go(ctx)
    }

    fn remix(&self, ctx: &RunContext) -> Result<(), ToolError> {
        cmd_remix(ctx)
    }
}

/// Rewrite Go-style single-dash long flags (`-verbose`, `-rule=x`) into the
/// double-dash form clap parses. Short flags and `--` are left alone.
pub fn normalize_go_flags(args: &[String]) -> Vec<String> {
    args.iter()
        .map(|arg| {
            let is_single_dash_long = arg.starts_with('-')
                && !arg.starts_with("--")
                && arg.split('=').next().is_some_and(|name| name.len() > 2);
            if is_single_dash_long {
                format!("-{}", arg)
            } else {
                arg.clone()
            }
        })
        .collect()
}

/// Parse the handler's flags with clap.
///
/// Returns `None` after printing help when `-help` was requested.
pub fn parse_flags<P: Parser>(subcommand: &str, ctx: &RunContext) -> Result<Option<P>, ToolError> {
    let argv = std::iter::once(subcommand.to_string()).chain(normalize_go_flags(ctx.args()));
    match P::try_parse_from(argv) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) if e.kind() == ErrorKind::DisplayHelp => {
            print!("{}", e);
            Ok(None)
        }
        Err(e) => {
            let rendered = e.to_string();
            let first_line = rendered.lines().next().unwrap_or_default();
            let reason = first_line.trim_start_matches("error: ");
            Err(DiagnosticError::new(format!("Invalid {} arguments: {}", subcommand, reason))
                .with("args", ctx.args().join(" "))
                .into())
        }
    }
}
