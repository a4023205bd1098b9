use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

fn env_filter(verbose: bool) -> EnvFilter {
    let default = if verbose {
        "info,parley_core=debug,parley_ai=debug"
    } else {
        "info"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Configure logging to stdout, plus a daily rolling file when `log_dir` is set.
///
/// The returned guard must be held until exit so buffered file output is flushed.
pub fn init(verbose: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_target(false)
        .with_level(true);

    let Some(log_dir) = log_dir else {
        builder.init();
        return Ok(None);
    };

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "parley.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    builder
        .with_ansi(false)
        .with_writer(std::io::stdout.and(non_blocking))
        .init();
    Ok(Some(guard))
}
