use std::{path::PathBuf, time::Duration};

use reqwest::StatusCode;
use thiserror::Error;

use crate::job::JobHandle;

/// Everything that can end a generation run early.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No API key configured (set WAN_API_KEY or `api_key` in the config file)")]
    AuthenticationMissing,

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The status endpoint is throttling or erroring; the task itself may be
    /// fine
    #[error("Status endpoint unavailable ({status}): {body}")]
    StatusUnavailable { status: StatusCode, body: String },

    /// The service answered, but without a task id
    #[error("Submission rejected by the service:\n{raw:#}")]
    RemoteRejection { raw: serde_json::Value },

    #[error("Task {handle} failed: {detail}")]
    JobFailed { handle: JobHandle, detail: String },

    /// The service reported a status we don't know how to interpret
    #[error("Task {handle} reported an unexpected status `{status}`:\n{raw:#}")]
    Unrecognized {
        handle: JobHandle,
        status: String,
        raw: serde_json::Value,
    },

    #[error("Download failed ({status}): {body}")]
    DownloadFailure { status: StatusCode, body: String },

    #[error("Gave up polling after {attempts} consecutive failed status checks")]
    PollAborted {
        attempts: u32,
        #[source]
        source: Box<JobError>,
    },

    #[error("Task {handle} did not finish within {elapsed:?}")]
    TimedOut { handle: JobHandle, elapsed: Duration },

    #[error("Couldn't read media file {path:?}")]
    MediaRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl JobError {
    /// Whether the polling loop may try again after this error
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            JobError::Transport(_) | JobError::StatusUnavailable { .. }
        )
    }
}
