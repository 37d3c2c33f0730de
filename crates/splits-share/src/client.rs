use std::time::Duration;

use bytes::Bytes;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{DownloadError, UploadError};

pub const DEFAULT_API_BASE: &str = "https://splits.io/api/v4";

/// Asks splits.io for a run in the format of the timer that recorded it.
pub const ORIGINAL_TIMER_MIME: &str = "application/original-timer";

#[derive(Debug, Deserialize)]
struct CreateRunResponse {
    uris: RunUris,
    presigned_request: PresignedRequest,
}

#[derive(Debug, Deserialize)]
struct RunUris {
    claim_uri: String,
}

#[derive(Debug, Deserialize)]
struct PresignedRequest {
    #[serde(deserialize_with = "deserialize_method")]
    method: Method,
    uri: String,
    fields: PresignedFields,
}

#[derive(Debug, Deserialize)]
struct PresignedFields {
    key: String,
    policy: String,
    #[serde(rename = "x-amz-credential")]
    credential: String,
    #[serde(rename = "x-amz-algorithm")]
    algorithm: String,
    #[serde(rename = "x-amz-date")]
    date: String,
    #[serde(rename = "x-amz-signature")]
    signature: String,
}

impl PresignedFields {
    fn into_form(self, run: Bytes) -> Form {
        Form::new()
            .text("key", self.key)
            .text("policy", self.policy)
            .text("x-amz-credential", self.credential)
            .text("x-amz-algorithm", self.algorithm)
            .text("x-amz-date", self.date)
            .text("x-amz-signature", self.signature)
            .part("file", Part::stream(run).file_name("splits.lss"))
    }
}

#[derive(Debug, Deserialize)]
struct RunnerPbsResponse {
    pbs: Vec<RunnerPb>,
}

#[derive(Debug, Deserialize)]
struct RunnerPb {
    id: String,
    game: Option<PbGame>,
}

#[derive(Debug, Deserialize)]
struct PbGame {
    shortname: Option<String>,
}

pub struct SplitsIoClient {
    client: Client,
    base_url: String,
}

impl SplitsIoClient {
    pub fn new(api_base: &str) -> Self {
        let base_url = api_base.trim_end_matches('/').to_string();
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, base_url }
    }

    /// Uploads a run and returns the URI the user visits to claim it.
    ///
    /// splits.io hands out a presigned storage request first; the run file is
    /// then posted to that request's URI together with its signed fields.
    pub async fn upload_lss(&self, run: Bytes) -> Result<String, UploadError> {
        let response = validated(self.client.post(format!("{}/runs", self.base_url)))
            .await
            .map_err(UploadError::ApiRequest)?;
        let created: CreateRunResponse = response
            .json()
            .await
            .map_err(UploadError::InvalidJsonResponse)?;

        let CreateRunResponse {
            uris,
            presigned_request,
        } = created;
        let method = presigned_request.method;
        debug!(
            target = "splits_io",
            %method,
            uri = %presigned_request.uri,
            size = run.len(),
            "uploading run file"
        );

        let form = presigned_request.fields.into_form(run);
        validated(
            self.client
                .request(method, &presigned_request.uri)
                .multipart(form),
        )
        .await
        .map_err(UploadError::UploadRequest)?;

        info!(target = "splits_io", claim_uri = %uris.claim_uri, "run uploaded");
        Ok(uris.claim_uri)
    }

    /// Downloads a run in the format of the timer that recorded it.
    pub async fn download_by_id(&self, id: &str) -> Result<Bytes, DownloadError> {
        let response = validated(
            self.client
                .get(format!("{}/runs/{}", self.base_url, id))
                .header(ACCEPT, ORIGINAL_TIMER_MIME),
        )
        .await
        .map_err(DownloadError::ApiRequest)?;

        let run = response.bytes().await.map_err(DownloadError::InvalidBuffer)?;
        debug!(target = "splits_io", id, size = run.len(), "run downloaded");
        Ok(run)
    }

    /// Finds a runner's personal best for a game by its short name and
    /// downloads it.
    pub async fn download_pb_by_username(
        &self,
        username: &str,
        game: &str,
    ) -> Result<Bytes, DownloadError> {
        let response = validated(
            self.client
                .get(format!("{}/runners/{}/pbs", self.base_url, username))
                .header(ACCEPT, ORIGINAL_TIMER_MIME),
        )
        .await
        .map_err(DownloadError::ApiRequest)?;

        let listing: RunnerPbsResponse = response
            .json()
            .await
            .map_err(DownloadError::InvalidJsonResponse)?;

        let pb = listing
            .pbs
            .into_iter()
            .find(|pb| {
                pb.game
                    .as_ref()
                    .and_then(|g| g.shortname.as_deref())
                    .is_some_and(|shortname| shortname == game)
            })
            .ok_or_else(|| DownloadError::GameNotFound(game.to_string()))?;

        debug!(target = "splits_io", username, game, id = %pb.id, "found personal best");
        self.download_by_id(&pb.id).await
    }
}

impl Default for SplitsIoClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

fn deserialize_method<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Method, D::Error> {
    let name = String::deserialize(deserializer)?;
    Method::from_bytes(name.as_bytes())
        .map_err(|_| de::Error::custom(format!("unsupported upload method '{name}'")))
}

/// Sends the request and treats any non-success status as an error.
async fn validated(request: RequestBuilder) -> Result<Response, reqwest::Error> {
    request.send().await?.error_for_status()
}
