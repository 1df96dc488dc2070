//! Tracing setup for the CLI.
//!
//! Logs go to stderr so stdout stays clean JSON. `QUICK_NEXT_DEBUG_LOG` forces
//! debug output; otherwise `RUST_LOG` applies, then `info`. With a log
//! directory, a daily-rolled file receives the same events.

use std::env;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const DEBUG_ENV: &str = "QUICK_NEXT_DEBUG_LOG";
const LOG_FILE_PREFIX: &str = "quick-next.log";

fn debug_forced() -> bool {
    env::var(DEBUG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

fn env_filter() -> EnvFilter {
    if debug_forced() {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Installs the global subscriber. Keep the returned guard alive for the life
/// of the process, or buffered file output is lost on exit.
pub fn init(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let Some(dir) = log_dir else {
        let _ = tracing_subscriber::registry()
            .with(env_filter())
            .with(stderr_layer)
            .try_init();
        return None;
    };

    if let Err(err) = fs_err::create_dir_all(dir) {
        eprintln!("quick-next: cannot create log directory: {err}");
        let _ = tracing_subscriber::registry()
            .with(env_filter())
            .with(stderr_layer)
            .try_init();
        return None;
    }

    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file_layer = fmt::layer().with_writer(writer).with_ansi(false);

    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
    Some(guard)
}
