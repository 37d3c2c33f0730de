use anyhow::Result;
use clap::Parser;
use splitdeck::cli::Cli;
use splitdeck::config::AppConfig;
use splitdeck::shell;
use splitdeck::telemetry::Telemetry;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::try_from(cli)?;
    let _telemetry = Telemetry::init(config.log_file.as_deref())?;
    info!(
        ws_url = config.ws_url.as_deref().unwrap_or("-"),
        segments = config.segments,
        splits_io_url = %config.splits_io_url,
        "starting splitdeck"
    );

    shell::run(config).await
}
