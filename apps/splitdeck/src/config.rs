use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use timer_remote::parse_address;

use crate::cli::Cli;

const MAX_SEGMENTS: usize = 999;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ws_url: Option<String>,
    pub segments: usize,
    pub log_file: Option<PathBuf>,
    pub splits_io_url: String,
}

impl TryFrom<Cli> for AppConfig {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let ws_url = match cli.ws_url.map(|url| url.trim().to_string()) {
            Some(url) if url.is_empty() => None,
            Some(url) => {
                parse_address(&url).with_context(|| format!("invalid --ws-url: {url}"))?;
                Some(url)
            }
            None => None,
        };

        if cli.segments == 0 || cli.segments > MAX_SEGMENTS {
            bail!("--segments must be between 1 and {MAX_SEGMENTS}, got {}", cli.segments);
        }

        let splits_io_url = cli.splits_io_url.trim().trim_end_matches('/').to_string();
        if !(splits_io_url.starts_with("http://") || splits_io_url.starts_with("https://")) {
            bail!("--splits-io-url must be an http(s) URL, got {splits_io_url}");
        }

        Ok(AppConfig {
            ws_url,
            segments: cli.segments,
            log_file: cli.log_file,
            splits_io_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Result<AppConfig> {
        let cli = Cli::try_parse_from(std::iter::once("splitdeck").chain(args.iter().copied()))
            .expect("arguments parse");
        AppConfig::try_from(cli)
    }

    #[test]
    fn defaults_point_at_splits_io_without_a_link() {
        let config = parse(&[]).expect("defaults are valid");
        assert_eq!(config.ws_url, None);
        assert_eq!(config.segments, 5);
        assert_eq!(config.splits_io_url, "https://splits.io/api/v4");
        assert!(config.log_file.is_none());
    }

    #[test]
    fn websocket_url_is_validated() {
        let config = parse(&["--ws-url", " ws://127.0.0.1:9001 "]).expect("valid ws url");
        assert_eq!(config.ws_url.as_deref(), Some("ws://127.0.0.1:9001"));

        let err = parse(&["--ws-url", "http://example.com"]).expect_err("http is rejected");
        assert!(err.to_string().contains("invalid --ws-url"));
    }

    #[test]
    fn blank_websocket_url_means_no_link() {
        let config = parse(&["--ws-url", "  "]).expect("blank is allowed");
        assert_eq!(config.ws_url, None);
    }

    #[test]
    fn segment_count_must_be_positive() {
        assert!(parse(&["--segments", "0"]).is_err());
        assert_eq!(parse(&["--segments", "12"]).expect("valid").segments, 12);
    }

    #[test]
    fn splits_io_url_is_normalized() {
        let config = parse(&["--splits-io-url", "http://127.0.0.1:3000/api/v4/"]).expect("valid");
        assert_eq!(config.splits_io_url, "http://127.0.0.1:3000/api/v4");
        assert!(parse(&["--splits-io-url", "ftp://splits.io"]).is_err());
    }
}
