//! Tracing setup for the `sos` binary.
//!
//! `sos send` keeps a durable trail of every dispatch attempt in a rotated
//! JSON file next to the store, and mirrors it to stderr so stdout carries
//! only the outcome JSON. The bookkeeping subcommands log to stderr alone
//! and stay quiet unless something goes wrong.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// File name prefix of the dispatch log; the appender adds `.YYYY-MM-DD`.
pub const DISPATCH_LOG_PREFIX: &str = "sos.log";

/// Default level for `send`.
const DISPATCH_LEVEL: &str = "info";

/// Default level for one-shot bookkeeping commands.
const QUIET_LEVEL: &str = "warn";

/// Keeps the dispatch log writer alive.
///
/// Hold it until the pipeline and any late audit write have finished;
/// dropping it flushes buffered entries to disk.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// `RUST_LOG` when set and valid, otherwise `fallback`.
fn filter_or(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install the dispatch logger: daily JSON file in `logs_dir` plus stderr.
///
/// # Errors
///
/// Returns an error if `logs_dir` cannot be created or another global
/// subscriber is already installed. The directory is created first either way.
pub fn init_production(logs_dir: &Path) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir)
        .map_err(|e| anyhow::anyhow!("cannot create log directory {}: {e}", logs_dir.display()))?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(
            logs_dir,
            DISPATCH_LOG_PREFIX,
        ));

    tracing_subscriber::registry()
        .with(filter_or(DISPATCH_LEVEL))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(file_writer),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing subscriber already installed: {e}"))?;

    Ok(LoggingGuard { _guard: guard })
}

/// Install a stderr-only logger for bookkeeping commands.
///
/// A second call, or a call after [`init_production`], leaves the existing
/// subscriber in place.
pub fn init_cli() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter_or(QUIET_LEVEL))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    if installed.is_err() {
        tracing::trace!("tracing subscriber already installed");
    }
}
