use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Keeps the non-blocking log writer flushing until dropped.
pub struct Telemetry {
    _guard: WorkerGuard,
}

impl Telemetry {
    /// Logs go to `log_file` when given, otherwise to stderr so they stay out
    /// of the shell's output. `RUST_LOG` overrides the default `info` filter.
    pub fn init(log_file: Option<&Path>) -> Result<Self> {
        let (writer, guard) = match log_file {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("failed to open log file {}", path.display()))?;
                tracing_appender::non_blocking(file)
            }
            None => tracing_appender::non_blocking(std::io::stderr()),
        };

        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(log_file.is_none())
                    .with_writer(writer),
            )
            .try_init()
            .context("failed to initialise tracing subscriber")?;

        Ok(Self { _guard: guard })
    }
}
