//! In-memory [`GenerationService`] for tests

use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use bytes::Bytes;
use reqwest::StatusCode;

use super::{ArtifactStream, GenerationService, ServiceFuture};
use crate::{
    error::JobError,
    job::{JobHandle, JobSpecification, JobStatus, Submission},
};

pub enum Scripted {
    Status(JobStatus),
    TransportError,
    /// the status endpoint answers with this HTTP status
    Unavailable(StatusCode),
    /// the request never completes
    Stall,
}

/// Plays back a fixed sequence of status responses and counts the calls made.
pub struct ScriptedService {
    pub submission: Submission,
    pub script: Mutex<VecDeque<Scripted>>,
    /// chunks of the artifact, or the status its download fails with
    pub artifact: Result<Vec<Bytes>, StatusCode>,
    submits: AtomicUsize,
    ticks: AtomicUsize,
    downloads: AtomicUsize,
}

impl ScriptedService {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            submission: Submission::Accepted(JobHandle::new("task-1")),
            script: Mutex::new(script.into_iter().collect()),
            artifact: Ok(vec![Bytes::from_static(b"fake video")]),
            submits: AtomicUsize::new(0),
            ticks: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
        }
    }

    pub fn statuses(script: impl IntoIterator<Item = JobStatus>) -> Self {
        Self::new(script.into_iter().map(Scripted::Status))
    }

    pub fn submits(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn ticks(&self) -> usize {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

/// A real `reqwest` error, produced without touching the network
pub fn transport_error() -> JobError {
    reqwest::Client::new()
        .get("not a url")
        .build()
        .unwrap_err()
        .into()
}

impl GenerationService for ScriptedService {
    fn submit<'a>(&'a self, _spec: &'a JobSpecification) -> ServiceFuture<'a, Submission> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        let submission = self.submission.clone();
        Box::pin(async move { Ok(submission) })
    }

    fn status<'a>(&'a self, _handle: &'a JobHandle) -> ServiceFuture<'a, JobStatus> {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("status polled after the script ended");
        let result = match next {
            Scripted::Status(status) => Ok(status),
            Scripted::TransportError => Err(transport_error()),
            Scripted::Unavailable(status) => Err(JobError::StatusUnavailable {
                status,
                body: r#"{"code":"Throttling.RateQuota"}"#.into(),
            }),
            Scripted::Stall => {
                return Box::pin(std::future::pending::<Result<JobStatus, JobError>>());
            }
        };
        Box::pin(async move { result })
    }

    fn open_artifact<'a>(&'a self, _location: &'a str) -> ServiceFuture<'a, ArtifactStream<'a>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let artifact = self.artifact.clone();
        Box::pin(async move {
            match artifact {
                Ok(chunks) => {
                    let stream: ArtifactStream<'a> =
                        Box::pin(tokio_stream::iter(chunks.into_iter().map(Ok::<_, JobError>)));
                    Ok(stream)
                }
                Err(status) => Err(JobError::DownloadFailure {
                    status,
                    body: "NoSuchKey".into(),
                }),
            }
        })
    }
}
