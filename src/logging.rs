//! File logging for every phase.
//!
//! Each phase writes to `debug.log` in its own workspace directory so that
//! the many concurrent remix children never interleave with the parent's
//! log. The path is also what the fatal report prints as `errorLog`.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Overrides the default filter, e.g. `OTEL_LOG=otel=trace`.
pub const LOG_FILTER_ENV: &str = "OTEL_LOG";

/// Install the global subscriber writing to `log_path`.
///
/// Returns the writer guard, which must outlive all logging; dropping it
/// flushes pending lines. Returns `None` when the log file cannot be used,
/// in which case the process runs without logging. The parent directory is
/// never created here.
pub fn init(log_path: &Path, verbose: bool) -> Option<WorkerGuard> {
    let dir = log_path.parent()?;
    if !dir.is_dir() {
        return None;
    }
    let file_name = log_path.file_name()?.to_str()?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .ok()?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .ok()?;

    Some(guard)
}
