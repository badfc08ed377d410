use otel::context::RunContext;
use otel::dispatch;
use otel::logging;

mod cmd;

fn main() {
    let mut argv = std::env::args();
    let program = argv.next().unwrap_or_default();
    let mut ctx = RunContext::from_env(program, argv.collect());

    // Logging needs the workspace, so it starts after preparation
    let (termination, guard) = dispatch::run(&mut ctx, &cmd::DefaultHandlers, |ctx| {
        logging::init(&ctx.log_path(), ctx.config().verbose)
    });
    termination.terminate(guard)
}
