//! Subcommand routing and failure surfacing.
//!
//! | Subcommand | Phase      | Handler            | On failure          |
//! |------------|------------|--------------------|---------------------|
//! | `version`  | unset      | `Handlers::version`| fatal report        |
//! | `set`      | unset      | `Handlers::set`    | fatal report        |
//! | `go`       | preprocess | `Handlers::go`     | fatal report        |
//! | `remix`    | instrument | `Handlers::remix`  | bare message, exit 1|
//!
//! `remix` only ever runs as a child of `go`, whose process already
//! collects the child's stderr and reports it, so the child prints the
//! error alone.

use tracing_appender::non_blocking::WorkerGuard;

use crate::context::RunContext;
use crate::errors::ToolError;
use crate::phase::{
    RunPhase, SUBCOMMAND_GO, SUBCOMMAND_REMIX, SUBCOMMAND_SET, SUBCOMMAND_VERSION,
};
use crate::report::{self, InvocationContext};

const USAGE: &str = "Usage: {} <command> [args]
Example:
\t{} go build
\t{} go install
\t{} go build main.go
\t{} version
\t{} set -verbose -rule=custom.json

Command:
\tversion    print the version
\tset        set the configuration
\tgo         build the Go application
";

/// Usage text with `tool` substituted for the program name.
pub fn usage(tool: &str) -> String {
    USAGE.replace("{}", tool)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subcommand {
    Version,
    Set,
    Go,
    Remix,
}

impl Subcommand {
    /// Exact match on the subcommand token.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            SUBCOMMAND_VERSION => Some(Subcommand::Version),
            SUBCOMMAND_SET => Some(Subcommand::Set),
            SUBCOMMAND_GO => Some(Subcommand::Go),
            SUBCOMMAND_REMIX => Some(Subcommand::Remix),
            _ => None,
        }
    }
}

/// The subcommand bodies. Each receives the run context and returns
/// either success or the error to surface.
pub trait Handlers {
    fn version(&self, ctx: &RunContext) -> Result<(), ToolError>;
    fn set(&self, ctx: &RunContext) -> Result<(), ToolError>;
    fn go(&self, ctx: &RunContext) -> Result<(), ToolError>;
    fn remix(&self, ctx: &RunContext) -> Result<(), ToolError>;
}

/// How the process ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    Success,
    /// Usage text for stdout; not a failure
    Usage(String),
    /// Rendered error for stderr from a remix child
    RemixFailed(String),
    /// Rendered fatal report
    Fatal(String),
}

impl Termination {
    pub fn exit_code(&self) -> i32 {
        match self {
            Termination::Success | Termination::Usage(_) => 0,
            Termination::RemixFailed(_) | Termination::Fatal(_) => 1,
        }
    }

    /// Write the outcome, flush logging and exit the process.
    pub fn terminate(self, guard: Option<WorkerGuard>) -> ! {
        let code = self.exit_code();
        match self {
            Termination::Success => {}
            Termination::Usage(text) => print!("{}", text),
            Termination::RemixFailed(message) => eprintln!("{}", message),
            Termination::Fatal(report) => {
                tracing::error!("{}", report);
                eprintln!("{}", console::style(&report).red().for_stderr());
            }
        }
        drop(guard);
        std::process::exit(code)
    }
}

/// Prepare the context and dispatch it.
///
/// `after_prepare` runs once the workspace and config are in place
/// (whether or not preparation succeeded) and before any handler; the
/// binary starts logging there. Its value is handed back alongside the
/// termination. With no subcommand nothing is prepared and the hook is
/// not called.
pub fn run<G>(
    ctx: &mut RunContext,
    handlers: &dyn Handlers,
    after_prepare: impl FnOnce(&RunContext) -> Option<G>,
) -> (Termination, Option<G>) {
    if ctx.subcommand().is_none() {
        return (Termination::Usage(usage(&ctx.tool_name())), None);
    }
    let prepared = ctx.prepare();
    let hooked = after_prepare(ctx);
    let termination = match prepared {
        Ok(()) => dispatch(ctx, handlers),
        Err(err) => fail(ctx, err),
    };
    (termination, hooked)
}

/// Route the context's subcommand to its handler and decide how a
/// failure is surfaced.
pub fn dispatch(ctx: &RunContext, handlers: &dyn Handlers) -> Termination {
    let Some(subcommand) = ctx.subcommand().and_then(Subcommand::parse) else {
        return Termination::Usage(usage(&ctx.tool_name()));
    };

    tracing::debug!(phase = %ctx.phase(), "Dispatching {}", ctx.command_line());

    let result = match subcommand {
        Subcommand::Version => handlers.version(ctx),
        Subcommand::Set => handlers.set(ctx),
        Subcommand::Go => handlers.go(ctx),
        Subcommand::Remix => handlers.remix(ctx),
    };

    match result {
        Ok(()) => Termination::Success,
        Err(err) => fail(ctx, err),
    }
}

/// Surface a failure: a remix child prints the rendered error alone,
/// everything else goes through the fatal report.
pub fn fail(ctx: &RunContext, err: ToolError) -> Termination {
    if ctx.subcommand().and_then(Subcommand::parse) == Some(Subcommand::Remix) {
        tracing::error!("remix failed: {}", err.summary());
        return Termination::RemixFailed(err.to_string());
    }

    let err = match ctx.phase() {
        RunPhase::Unset => err,
        phase => err.annotate("phase", phase.as_str()),
    };
    Termination::Fatal(report::render(&InvocationContext::capture(ctx), &err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DiagnosticError;
    use crate::workspace::TempWorkspace;
    use std::cell::RefCell;
    use tempfile::tempdir;

    /// Records which handler ran; `go` and `remix` fail with the given
    /// builders when set.
    #[derive(Default)]
    struct StubHandlers {
        calls: RefCell<Vec<&'static str>>,
        go_error: Option<fn() -> ToolError>,
        remix_error: Option<fn() -> ToolError>,
    }

    impl Handlers for StubHandlers {
        fn version(&self, _ctx: &RunContext) -> Result<(), ToolError> {
            self.calls.borrow_mut().push("version");
            Ok(())
        }

        fn set(&self, _ctx: &RunContext) -> Result<(), ToolError> {
            self.calls.borrow_mut().push("set");
            Ok(())
        }

        fn go(&self, _ctx: &RunContext) -> Result<(), ToolError> {
            self.calls.borrow_mut().push("go");
            self.go_error.map_or(Ok(()), |make| Err(make()))
        }

        fn remix(&self, _ctx: &RunContext) -> Result<(), ToolError> {
            self.calls.borrow_mut().push("remix");
            self.remix_error.map_or(Ok(()), |make| Err(make()))
        }
    }

    fn run_plain(ctx: &mut RunContext, handlers: &dyn Handlers) -> Termination {
        run(ctx, handlers, |_| None::<()>).0
    }

    fn context(root: &std::path::Path, args: &[&str], phase: RunPhase) -> RunContext {
        let mut ctx = RunContext::new(
            "/usr/local/bin/otel",
            args.iter().map(|a| a.to_string()).collect(),
            TempWorkspace::new(root.join(".otel-build")),
        );
        ctx.set_phase(phase);
        ctx
    }

    #[test]
    fn no_arguments_prints_usage_and_succeeds() {
        let dir = tempdir().unwrap();
        let handlers = StubHandlers::default();
        let mut ctx = context(dir.path(), &[], RunPhase::Unset);

        let termination = run_plain(&mut ctx, &handlers);

        assert_eq!(termination, Termination::Usage(usage("otel")));
        assert_eq!(termination.exit_code(), 0);
        assert!(handlers.calls.borrow().is_empty());
        assert!(!dir.path().join(".otel-build").exists());
    }

    #[test]
    fn unknown_subcommand_prints_usage_and_succeeds() {
        let dir = tempdir().unwrap();
        let handlers = StubHandlers::default();
        let mut ctx = context(dir.path(), &["biuld"], RunPhase::Unset);

        let termination = run_plain(&mut ctx, &handlers);

        assert!(matches!(&termination, Termination::Usage(text) if text.contains("otel go build")));
        assert_eq!(termination.exit_code(), 0);
        assert!(handlers.calls.borrow().is_empty());
    }

    #[test]
    fn each_subcommand_reaches_its_handler() {
        let dir = tempdir().unwrap();
        for (token, phase) in [
            ("version", RunPhase::Unset),
            ("set", RunPhase::Unset),
            ("go", RunPhase::Preprocess),
            ("remix", RunPhase::Instrument),
        ] {
            let handlers = StubHandlers::default();
            let ctx = context(dir.path(), &[token], phase);
            assert_eq!(dispatch(&ctx, &handlers), Termination::Success);
            assert_eq!(*handlers.calls.borrow(), vec![token]);
        }
    }

    #[test]
    fn remix_failure_bypasses_fatal_report() {
        let dir = tempdir().unwrap();
        let handlers = StubHandlers {
            remix_error: Some(|| ToolError::from(DiagnosticError::new("compile failed"))),
            ..Default::default()
        };
        let ctx = context(dir.path(), &["remix", "/go/pkg/tool/compile"], RunPhase::Instrument);

        let termination = dispatch(&ctx, &handlers);

        assert_eq!(termination.exit_code(), 1);
        match termination {
            Termination::RemixFailed(message) => {
                assert!(message.starts_with("compile failed\n"));
                assert!(message.len() > "compile failed\n".len());
                assert!(!message.contains("===== Environments ====="));
            }
            other => panic!("Expected RemixFailed, got {:?}", other),
        }
    }

    #[test]
    fn go_failure_renders_fatal_report_with_details() {
        let dir = tempdir().unwrap();
        let handlers = StubHandlers {
            go_error: Some(|| ToolError::from(DiagnosticError::new("link error").with("stage", "link"))),
            ..Default::default()
        };
        let ctx = context(dir.path(), &["go", "build"], RunPhase::Preprocess);

        let termination = dispatch(&ctx, &handlers);

        assert_eq!(termination.exit_code(), 1);
        match termination {
            Termination::Fatal(report) => {
                assert!(report.contains("command    : /usr/local/bin/otel go build\n"));
                assert!(report.contains("stage      : link\n"));
                assert!(report.contains("phase      : preprocess\n"));
                let summary = report.split("===== Fatal Error ======").nth(1).unwrap();
                assert!(summary.ends_with("link error"));
            }
            other => panic!("Expected Fatal, got {:?}", other),
        }
    }

    #[test]
    fn opaque_go_failure_still_reports() {
        let dir = tempdir().unwrap();
        let handlers = StubHandlers {
            go_error: Some(|| ToolError::from(anyhow::anyhow!("go: command not found"))),
            ..Default::default()
        };
        let ctx = context(dir.path(), &["go", "build"], RunPhase::Preprocess);

        match dispatch(&ctx, &handlers) {
            Termination::Fatal(report) => {
                assert!(!report.contains("phase      :"));
                assert!(report.ends_with("go: command not found"));
            }
            other => panic!("Expected Fatal, got {:?}", other),
        }
    }

    #[test]
    fn run_prepares_workspace_before_dispatch() {
        let dir = tempdir().unwrap();
        let handlers = StubHandlers::default();
        let mut ctx = context(dir.path(), &["go", "build"], RunPhase::Preprocess);

        assert_eq!(run_plain(&mut ctx, &handlers), Termination::Success);
        assert!(ctx.workspace().dir_for(RunPhase::Preprocess).is_dir());
        assert!(ctx.workspace().dir_for(RunPhase::Instrument).is_dir());
    }

    #[test]
    fn hook_sees_prepared_workspace_and_its_value_is_returned() {
        let dir = tempdir().unwrap();
        let handlers = StubHandlers::default();
        let mut ctx = context(dir.path(), &["version"], RunPhase::Unset);

        let (termination, hooked) = run(&mut ctx, &handlers, |ctx| {
            Some(ctx.workspace().dir_for(RunPhase::Preprocess).is_dir())
        });

        assert_eq!(termination, Termination::Success);
        assert_eq!(hooked, Some(true));
        assert_eq!(*handlers.calls.borrow(), vec!["version"]);
    }

    #[test]
    fn hook_is_skipped_without_subcommand() {
        let dir = tempdir().unwrap();
        let handlers = StubHandlers::default();
        let mut ctx = context(dir.path(), &[], RunPhase::Unset);
        let mut called = false;

        let (_, hooked) = run(&mut ctx, &handlers, |_| {
            called = true;
            Some(())
        });

        assert!(!called);
        assert!(hooked.is_none());
    }

    #[test]
    fn startup_failure_in_remix_is_short_circuited() {
        let dir = tempdir().unwrap();
        let root = dir.path().join(".otel-build");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("conf.toml"), "verbose = [").unwrap();
        let handlers = StubHandlers::default();
        let mut ctx = context(dir.path(), &["remix", "compile"], RunPhase::Instrument);

        let termination = run_plain(&mut ctx, &handlers);

        assert!(matches!(&termination, Termination::RemixFailed(m) if m.starts_with("Failed to parse config file")));
        assert!(handlers.calls.borrow().is_empty());
    }

    #[test]
    fn usage_substitutes_tool_name() {
        let text = usage("otel-dev");
        assert!(text.starts_with("Usage: otel-dev <command> [args]\n"));
        assert!(text.contains("\totel-dev set -verbose -rule=custom.json\n"));
        assert!(!text.contains("{}"));
    }

    #[test]
    fn subcommand_parse_is_exact() {
        assert_eq!(Subcommand::parse("go"), Some(Subcommand::Go));
        assert_eq!(Subcommand::parse("xgo"), None);
        assert_eq!(Subcommand::parse("Remix"), None);
    }
}
