//! Backend client: the only place coverdesk talks HTTP.
//!
//! Two endpoints, both JSON on the way back:
//! - `POST /api/extract-text` (multipart, field `resume`)
//! - `POST /api/generate-cover-letter` (JSON `{resumeText, jobDescription}`)
//!
//! Failures stay typed here. Turning them into display text is the
//! controller's job.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::api::{
    ErrorBody, ExtractTextResponse, GenerateCoverLetterRequest, GenerateCoverLetterResponse,
};
use crate::models::upload::UploadedFile;

pub const EXTRACT_TEXT_ENDPOINT: &str = "/api/extract-text";
pub const GENERATE_COVER_LETTER_ENDPOINT: &str = "/api/generate-cover-letter";
/// Multipart field the extraction endpoint reads the file from.
pub const RESUME_FIELD: &str = "resume";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend returned status {status}")]
    Status { status: u16, message: Option<String> },

    #[error("Malformed response body: {0}")]
    Decode(String),

    /// The task running the request panicked or was cancelled.
    #[error("Request task failed: {0}")]
    TaskFailed(String),
}

impl ApiError {
    /// The backend's own `error` text, when it sent a non-empty one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status {
                message: Some(message),
                ..
            } if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

/// The two backend calls the controller depends on.
/// `HttpBackend` is the real one; tests plug in canned backends.
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn extract_text(&self, file: &UploadedFile) -> Result<String, ApiError>;

    async fn generate_cover_letter(
        &self,
        request: &GenerateCoverLetterRequest,
    ) -> Result<String, ApiError>;
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(
            config.backend_url.clone(),
            config.request_timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn extract_text(&self, file: &UploadedFile) -> Result<String, ApiError> {
        let url = self.url(EXTRACT_TEXT_ENDPOINT);
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)?;
        let form = Form::new().part(RESUME_FIELD, part);

        info!(
            "Uploading {} ({} bytes) to {}",
            file.file_name,
            file.size(),
            url
        );

        let response = self.client.post(&url).multipart(form).send().await?;
        let body: ExtractTextResponse = read_json(response).await?;

        debug!("Extracted {} characters of resume text", body.text.len());
        Ok(body.text)
    }

    async fn generate_cover_letter(
        &self,
        request: &GenerateCoverLetterRequest,
    ) -> Result<String, ApiError> {
        let url = self.url(GENERATE_COVER_LETTER_ENDPOINT);

        info!(
            "Requesting cover letter from {} (resume {} chars, job description {} chars)",
            url,
            request.resume_text.len(),
            request.job_description.len()
        );

        let response = self.client.post(&url).json(request).send().await?;
        let body: GenerateCoverLetterResponse = read_json(response).await?;

        debug!("Received cover letter of {} characters", body.cover_letter.len());
        Ok(body.cover_letter)
    }
}

/// Splits a response into the success body or a `Status` error carrying the
/// backend's `error` field, if the error body parses.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error);
        warn!("Backend returned {}: {}", status, body);
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}
