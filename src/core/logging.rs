//! Process-wide tracing: human-readable stdout plus a daily-rolling file in
//! the data directory's `logs/`.

use std::sync::OnceLock;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::AppPaths;

/// Filter directives for the service, e.g. `ALEXANDRIA_LOG=debug`.
/// Falls back to `RUST_LOG`.
pub const LOG_FILTER_ENV: &str = "ALEXANDRIA_LOG";

const DEFAULT_DIRECTIVES: &str = "info,tower_http=debug";
const LOG_FILE_PREFIX: &str = "alexandria.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Installs the global subscriber. Must run before anything else logs,
/// including configuration loading.
pub fn init(paths: &AppPaths) -> anyhow::Result<()> {
    std::fs::create_dir_all(&paths.log_dir)
        .with_context(|| format!("Failed to create log directory {}", paths.log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(&paths.log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let directives = std::env::var(LOG_FILTER_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(non_blocking);

    tracing_subscriber::registry()
        .with(filter_from(directives.as_deref()))
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    // the writer thread flushes until the guard drops
    let _ = LOG_GUARD.set(guard);

    tracing::info!("Writing logs to {}", paths.log_dir.display());
    Ok(())
}

/// Unparseable or blank directives fall back to the defaults.
fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}
