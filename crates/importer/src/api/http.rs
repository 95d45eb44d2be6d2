//! `reqwest` implementation of [`ImportBackend`].

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::Instrument;

use super::backend::ImportBackend;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::model::{ErrorBody, JobTicket, TaskListResponse, TaskSummary, UploadResponse};

/// Maximum length for error bodies carried into messages and logs.
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Truncates an error body so a misbehaving server cannot flood the logs.
fn sanitize_error_body(body: &str) -> String {
    let body = body.trim();
    if body.len() > MAX_ERROR_BODY_LENGTH {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated)", &body[..end])
    } else {
        body.to_string()
    }
}

/// Extracts the user-facing message from a non-success response body.
///
/// Uses the backend's `{ "error": "..." }` field. A JSON body without a
/// usable `error` yields an empty message so callers apply their generic
/// text; only non-JSON bodies fall back to the (truncated) raw text.
fn error_message_from_body(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error.trim().to_string(),
        Err(_) => sanitize_error_body(body),
    }
}

/// Import backend reached over HTTP.
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    /// Creates a backend for the configured API URL.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let base = Url::parse(config.base_url())
            .map_err(|e| ApiError::Client(format!("Invalid API URL '{}': {}", config.api_url, e)))?;

        let mut builder = Client::builder().connect_timeout(config.connect_timeout());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self { client, base })
    }

    /// Base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Builds an endpoint URL, percent-encoding each path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Client(format!("API URL '{}' cannot be a base", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn check_status(endpoint: &str, response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message_from_body(&body);
        warn!("{} returned {}: {}", endpoint, status, message);

        Err(ApiError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(endpoint: &str, response: Response) -> Result<T, ApiError> {
        response.json::<T>().await.map_err(|e| ApiError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }

    fn transport(endpoint: &str, err: reqwest::Error) -> ApiError {
        ApiError::Transport {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl ImportBackend for HttpBackend {
    async fn upload(&self, filename: &str, contents: Vec<u8>) -> Result<String, ApiError> {
        const ENDPOINT: &str = "/upload";
        let span = tracing::info_span!("importer.upload", filename = %filename, bytes = contents.len());

        async move {
            let url = self.endpoint(&["upload"])?;
            let part = Part::bytes(contents)
                .file_name(filename.to_string())
                .mime_str("text/csv")
                .map_err(|e| ApiError::Client(e.to_string()))?;
            let form = Form::new().part("file", part);

            info!("Uploading {} to {}", filename, url);

            let response = self
                .client
                .post(url)
                .multipart(form)
                .send()
                .await
                .map_err(|e| Self::transport(ENDPOINT, e))?;
            let response = Self::check_status(ENDPOINT, response).await?;
            let body: UploadResponse = Self::decode(ENDPOINT, response).await?;

            let job_id = body.job_id.trim().to_string();
            if job_id.is_empty() {
                return Err(ApiError::Decode {
                    endpoint: ENDPOINT.to_string(),
                    message: "response did not include a job_id".to_string(),
                });
            }

            info!("Upload of {} accepted as job {}", filename, job_id);
            Ok(job_id)
        }
        .instrument(span)
        .await
    }

    async fn progress(&self, job_id: &str) -> Result<JobTicket, ApiError> {
        const ENDPOINT: &str = "/progress";
        let span = tracing::debug_span!("importer.progress", job_id = %job_id);

        async move {
            let url = self.endpoint(&["progress"])?;
            let response = self
                .client
                .get(url)
                .query(&[("job_id", job_id)])
                .send()
                .await
                .map_err(|e| Self::transport(ENDPOINT, e))?;
            let response = Self::check_status(ENDPOINT, response).await?;
            let mut ticket: JobTicket = Self::decode(ENDPOINT, response).await?;

            if ticket.job_id.is_empty() {
                ticket.job_id = job_id.to_string();
            }

            debug!(
                "Job {} is {} ({}/{})",
                job_id, ticket.status, ticket.processed, ticket.total
            );
            Ok(ticket)
        }
        .instrument(span)
        .await
    }

    async fn scheduled_tasks(&self) -> Result<Vec<TaskSummary>, ApiError> {
        const ENDPOINT: &str = "/scheduled-tasks";

        let url = self.endpoint(&["scheduled-tasks"])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::transport(ENDPOINT, e))?;
        let response = Self::check_status(ENDPOINT, response).await?;
        let body: TaskListResponse = Self::decode(ENDPOINT, response).await?;

        debug!("Backend listed {} tasks", body.tasks.len());
        Ok(body.tasks)
    }

    async fn retry(&self, job_id: &str) -> Result<(), ApiError> {
        let endpoint = format!("/retry/{}", job_id);
        let span = tracing::info_span!("importer.retry", job_id = %job_id);

        async move {
            let url = self.endpoint(&["retry", job_id])?;
            info!("Requesting retry of job {}", job_id);

            let response = self
                .client
                .post(url)
                .send()
                .await
                .map_err(|e| Self::transport(&endpoint, e))?;
            Self::check_status(&endpoint, response).await?;
            Ok(())
        }
        .instrument(span)
        .await
    }
}
