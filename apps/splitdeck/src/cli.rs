use std::path::PathBuf;

use clap::Parser;
use splits_share::DEFAULT_API_BASE;

#[derive(Debug, Parser)]
#[command(
    name = "splitdeck",
    author,
    version,
    about = "Split timer with a WebSocket remote-control link"
)]
pub struct Cli {
    /// WebSocket server to connect to at startup (ws:// or wss://).
    #[arg(long, env = "SPLITDECK_WS_URL")]
    pub ws_url: Option<String>,

    /// Number of segments in the run.
    #[arg(long, env = "SPLITDECK_SEGMENTS", default_value_t = 5)]
    pub segments: usize,

    /// Append logs to this file instead of stderr.
    #[arg(long, env = "SPLITDECK_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Base URL of the splits.io API.
    #[arg(long, env = "SPLITDECK_SPLITS_IO_URL", default_value = DEFAULT_API_BASE)]
    pub splits_io_url: String,
}
