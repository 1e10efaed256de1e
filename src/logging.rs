//! Tracing initialisation for embedders.
//!
//! The library itself only emits events; installing a subscriber is the
//! embedder's call. These helpers set up the daily-rotating file layer used
//! by the reference presentation layer, with an optional console mirror.

use anyhow::{Context, Result};
use camino::Utf8Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber with a daily-rotating file appender in
/// `log_dir` (created if missing). Returns the non-blocking writer guard;
/// dropping it flushes and stops the background writer, so hold it for the
/// life of the embedder.
pub fn setup_logging(
    log_dir: &Utf8Path,
    log_prefix: &str,
    debug_mode: bool,
) -> Result<WorkerGuard> {
    init_subscriber(log_dir, log_prefix, debug_mode, false)
}

/// Like [`setup_logging`], but also mirrors events to the console. Useful
/// during development.
pub fn setup_logging_with_console(
    log_dir: &Utf8Path,
    log_prefix: &str,
    debug_mode: bool,
    console_output: bool,
) -> Result<WorkerGuard> {
    init_subscriber(log_dir, log_prefix, debug_mode, console_output)
}

fn init_subscriber(
    log_dir: &Utf8Path,
    log_prefix: &str,
    debug_mode: bool,
    console_output: bool,
) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("create log directory {log_dir}"))?;

    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(log_dir, log_prefix));
    let filter = EnvFilter::new(if debug_mode { "debug" } else { "info" });
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false) // log files stay ANSI-free
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);
    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    if console_output {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_target(false);
        registry.with(console_layer).try_init()
    } else {
        registry.try_init()
    }
    .context("set global tracing subscriber")?;

    tracing::info!(
        "logging initialised: dir={}, prefix={}, debug={}, console={}",
        log_dir,
        log_prefix,
        debug_mode,
        console_output
    );
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    // one test owns subscriber installation: the global default can only be
    // set once per process
    #[test]
    fn test_log_lines_reach_rotated_file() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = Utf8PathBuf::from_path_buf(dir.path().join("logs")).unwrap();

        let guard = setup_logging(&log_dir, "cadpack", false).unwrap();
        tracing::info!("rotation smoke line");
        drop(guard); // flush the non-blocking writer

        let mut contents = String::new();
        for entry in log_dir.read_dir_utf8().unwrap() {
            let entry = entry.unwrap();
            if entry.file_name().starts_with("cadpack") {
                contents.push_str(&std::fs::read_to_string(entry.path()).unwrap());
            }
        }
        assert!(contents.contains("rotation smoke line"));

        // a second installation is refused, not silently stacked
        assert!(setup_logging(&log_dir, "cadpack", false).is_err());
    }
}
