//! Version reporting: `otel version`.

use clap::Parser;

use otel::config::TOOL_VERSION;
use otel::context::RunContext;
use otel::errors::ToolError;
use otel::report::toolchain_identity;

use super::parse_flags;

#[derive(Parser, Debug)]
#[command(name = "version", disable_version_flag = true)]
struct VersionArgs {
    /// Also print the toolchain that built this binary
    #[arg(long)]
    verbose: bool,
}

pub fn cmd_version(ctx: &RunContext) -> Result<(), ToolError> {
    let Some(args) = parse_flags::<VersionArgs>("version", ctx)? else {
        return Ok(());
    };

    println!("{} version {}", ctx.tool_name(), TOOL_VERSION);
    if args.verbose {
        println!("toolchain: {}", toolchain_identity());
    }
    Ok(())
}
