use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to request an upload slot from splits.io: {0}")]
    ApiRequest(#[source] reqwest::Error),
    #[error("splits.io returned an unexpected upload response: {0}")]
    InvalidJsonResponse(#[source] reqwest::Error),
    #[error("failed to upload the run file: {0}")]
    UploadRequest(#[source] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to fetch from splits.io: {0}")]
    ApiRequest(#[source] reqwest::Error),
    #[error("failed to read the downloaded run: {0}")]
    InvalidBuffer(#[source] reqwest::Error),
    #[error("splits.io returned an unexpected response: {0}")]
    InvalidJsonResponse(#[source] reqwest::Error),
    #[error("no personal best found for game '{0}'")]
    GameNotFound(String),
}
