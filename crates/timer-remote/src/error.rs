use thiserror::Error;

/// Reasons a connect request is refused before any transport is started.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("no server address given")]
    EmptyAddress,
    #[error("invalid server address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported scheme '{0}', expected ws:// or wss://")]
    UnsupportedScheme(String),
}
