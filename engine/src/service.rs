use std::{pin::Pin, time::Duration};

use bytes::Bytes;
use log::debug;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tokio_stream::{Stream, StreamExt};

use crate::{
    config::Config,
    error::JobError,
    job::{JobHandle, JobSpecification, JobStatus, Submission},
};

#[cfg(test)]
pub(crate) mod scripted;

pub type ArtifactStream<'a> = Pin<Box<dyn Stream<Item = Result<Bytes, JobError>> + Send + 'a>>;
pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, JobError>> + Send + 'a>>;

/// The remote side of a generation job.
pub trait GenerationService {
    fn submit<'a>(&'a self, spec: &'a JobSpecification) -> ServiceFuture<'a, Submission>;

    /// A single status fetch. Transport problems come back as
    /// [`JobError::Transport`], throttling and server errors as
    /// [`JobError::StatusUnavailable`], a body we can't make sense of as
    /// [`JobStatus::Unrecognized`].
    fn status<'a>(&'a self, handle: &'a JobHandle) -> ServiceFuture<'a, JobStatus>;

    /// Opens the artifact for streaming. Fails with
    /// [`JobError::DownloadFailure`] on a non-success status.
    fn open_artifact<'a>(&'a self, location: &'a str) -> ServiceFuture<'a, ArtifactStream<'a>>;
}

/// DashScope's async video-synthesis API
#[derive(Debug, Clone)]
pub struct DashScope {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl DashScope {
    /// Artifact downloads only get a connect timeout, they may take a while.
    pub fn new(cfg: &Config) -> Result<Self, JobError> {
        let client = Client::builder()
            .connect_timeout(cfg.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            request_timeout: cfg.request_timeout,
        })
    }

    fn api_key(&self) -> Result<&str, JobError> {
        self.api_key.as_deref().ok_or(JobError::AuthenticationMissing)
    }

    pub fn submission_url(&self) -> String {
        format!(
            "{}/services/aigc/video-generation/video-synthesis",
            self.base_url
        )
    }

    pub fn status_url(&self, handle: &JobHandle) -> String {
        format!("{}/tasks/{}", self.base_url, handle)
    }
}

impl GenerationService for DashScope {
    fn submit<'a>(&'a self, spec: &'a JobSpecification) -> ServiceFuture<'a, Submission> {
        Box::pin(async move {
            let api_key = self.api_key()?;
            debug!("Submitting {}", summary(spec));

            let resp = self
                .client
                .post(self.submission_url())
                .bearer_auth(api_key)
                .header("X-DashScope-Async", "enable")
                .timeout(self.request_timeout)
                .json(&spec.to_request_body())
                .send()
                .await?;

            let body = read_json(resp).await?;
            debug!("Submission response: {body:#}");
            Ok(Submission::from_response(body))
        })
    }

    fn status<'a>(&'a self, handle: &'a JobHandle) -> ServiceFuture<'a, JobStatus> {
        Box::pin(async move {
            let api_key = self.api_key()?;
            let resp = self
                .client
                .get(self.status_url(handle))
                .bearer_auth(api_key)
                .timeout(self.request_timeout)
                .send()
                .await?;

            let status = resp.status();
            if is_retryable(status) {
                let body = resp.text().await.unwrap_or_default();
                return Err(JobError::StatusUnavailable { status, body });
            }

            let body = read_json(resp).await?;
            debug!("Status response: {body:#}");
            Ok(JobStatus::from_response(body))
        })
    }

    fn open_artifact<'a>(&'a self, location: &'a str) -> ServiceFuture<'a, ArtifactStream<'a>> {
        Box::pin(async move {
            let resp = self.client.get(location).send().await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(JobError::DownloadFailure { status, body });
            }

            let stream: ArtifactStream<'a> =
                Box::pin(resp.bytes_stream().map(|chunk| chunk.map_err(JobError::from)));
            Ok(stream)
        })
    }
}

/// Throttling and server errors say nothing about the task itself
fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// One line describing a submission, without inlined image data
fn summary(spec: &JobSpecification) -> String {
    let mut line = format!(
        "{} job, model {}, {}, {}s: {:?}",
        spec.kind(),
        spec.model(),
        spec.dimensions(),
        spec.duration(),
        spec.prompt()
    );
    if let Some(media) = spec.media_reference() {
        line.push_str(&format!(", image {media}"));
    }
    line
}

/// The service reports problems in a JSON body as well, so the status code
/// alone isn't checked here. A body that isn't JSON is kept as a string.
async fn read_json(resp: Response) -> Result<Value, JobError> {
    let status = resp.status();
    let text = resp.text().await?;
    Ok(serde_json::from_str(&text).unwrap_or_else(|_| {
        Value::String(format!("{status}: {text}"))
    }))
}
