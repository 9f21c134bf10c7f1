use std::{fmt, path::PathBuf};

use serde::Serialize;
use serde_json::Value;
use strum::Display;

use crate::{config::Config, error::JobError, media::MediaReference};

/// Generation mode, chosen once when the specification is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    TextToMedia { size: String },
    MediaToMedia { media: MediaReference, resolution: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ModeKind {
    #[strum(to_string = "T2V")]
    TextToMedia,
    #[strum(to_string = "I2V")]
    MediaToMedia,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpecification {
    model: String,
    prompt: String,
    mode: Mode,
    duration: u32,
    prompt_extend: bool,
    shot_type: String,
}

impl JobSpecification {
    /// The presence of `media` is the only thing that selects the mode.
    pub fn build(
        prompt: &str,
        media: Option<MediaReference>,
        cfg: &Config,
    ) -> Result<Self, JobError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(JobError::InvalidInput("the prompt must not be empty".into()));
        }

        let (model, mode) = match media {
            Some(media) => (
                cfg.model_i2v.clone(),
                Mode::MediaToMedia {
                    media,
                    resolution: cfg.resolution.clone(),
                },
            ),
            None => (
                cfg.model_t2v.clone(),
                Mode::TextToMedia {
                    size: cfg.size.clone(),
                },
            ),
        };

        Ok(Self {
            model,
            prompt: prompt.to_string(),
            mode,
            duration: cfg.duration,
            prompt_extend: cfg.prompt_extend,
            shot_type: cfg.shot_type.clone(),
        })
    }

    pub fn kind(&self) -> ModeKind {
        match self.mode {
            Mode::TextToMedia { .. } => ModeKind::TextToMedia,
            Mode::MediaToMedia { .. } => ModeKind::MediaToMedia,
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn media_reference(&self) -> Option<&MediaReference> {
        match &self.mode {
            Mode::MediaToMedia { media, .. } => Some(media),
            Mode::TextToMedia { .. } => None,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// `resolution` for I2V, `size` for T2V
    pub fn dimensions(&self) -> &str {
        match &self.mode {
            Mode::TextToMedia { size } => size,
            Mode::MediaToMedia { resolution, .. } => resolution,
        }
    }

    pub fn to_request_body(&self) -> RequestBody<'_> {
        let (img_url, resolution, size) = match &self.mode {
            Mode::TextToMedia { size } => (None, None, Some(size.as_str())),
            Mode::MediaToMedia { media, resolution } => {
                (Some(media), Some(resolution.as_str()), None)
            }
        };

        RequestBody {
            model: &self.model,
            input: Input {
                prompt: &self.prompt,
                img_url,
            },
            parameters: Parameters {
                resolution,
                size,
                prompt_extend: self.prompt_extend,
                duration: self.duration,
                shot_type: &self.shot_type,
            },
        }
    }
}

/// Body of the video-synthesis submission
#[derive(Debug, Serialize)]
pub struct RequestBody<'a> {
    pub model: &'a str,
    pub input: Input<'a>,
    pub parameters: Parameters<'a>,
}

#[derive(Debug, Serialize)]
pub struct Input<'a> {
    pub prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img_url: Option<&'a MediaReference>,
}

#[derive(Debug, Serialize)]
pub struct Parameters<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<&'a str>,
    pub prompt_extend: bool,
    pub duration: u32,
    pub shot_type: &'a str,
}

/// Remote task id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self(task_id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a submission. A response without a task id is a value the
/// caller has to look at, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Accepted(JobHandle),
    Rejected(Value),
}

impl Submission {
    pub fn from_response(body: Value) -> Self {
        match body["output"]["task_id"].as_str() {
            Some(id) if !id.is_empty() => Submission::Accepted(JobHandle::new(id)),
            _ => Submission::Rejected(body),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unrecognized,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobState::Pending | JobState::Running)
    }
}

/// One status snapshot. Never updated in place, every poll replaces it.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded { artifact_location: String },
    Failed { detail: String },
    Unrecognized { raw_status: String, raw: Value },
}

impl JobStatus {
    pub fn from_response(body: Value) -> Self {
        let output = &body["output"];
        let Some(status) = output["task_status"].as_str() else {
            return JobStatus::Unrecognized {
                raw_status: "<missing>".into(),
                raw: body,
            };
        };

        match status {
            "PENDING" => JobStatus::Pending,
            "RUNNING" => JobStatus::Running,
            "SUCCEEDED" => match output["video_url"].as_str() {
                Some(url) => JobStatus::Succeeded {
                    artifact_location: url.to_string(),
                },
                None => JobStatus::Unrecognized {
                    raw_status: status.to_string(),
                    raw: body,
                },
            },
            "FAILED" => {
                let detail = output["message"]
                    .as_str()
                    .or_else(|| output["code"].as_str())
                    .unwrap_or("unknown error")
                    .to_string();
                JobStatus::Failed { detail }
            }
            other => JobStatus::Unrecognized {
                raw_status: other.to_string(),
                raw: body,
            },
        }
    }

    pub fn state(&self) -> JobState {
        match self {
            JobStatus::Pending => JobState::Pending,
            JobStatus::Running => JobState::Running,
            JobStatus::Succeeded { .. } => JobState::Succeeded,
            JobStatus::Failed { .. } => JobState::Failed,
            JobStatus::Unrecognized { .. } => JobState::Unrecognized,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    pub fn artifact_location(&self) -> Option<&str> {
        match self {
            JobStatus::Succeeded { artifact_location } => Some(artifact_location),
            _ => None,
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match self {
            JobStatus::Failed { detail } => Some(detail),
            _ => None,
        }
    }

    /// `None` while the task is still pending or running
    pub fn into_terminal(self) -> Option<TerminalStatus> {
        match self {
            JobStatus::Pending | JobStatus::Running => None,
            JobStatus::Succeeded { artifact_location } => {
                Some(TerminalStatus::Succeeded { artifact_location })
            }
            JobStatus::Failed { detail } => Some(TerminalStatus::Failed { detail }),
            JobStatus::Unrecognized { raw_status, raw } => {
                Some(TerminalStatus::Unrecognized { raw_status, raw })
            }
        }
    }
}

/// A status the task won't leave again
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalStatus {
    Succeeded { artifact_location: String },
    Failed { detail: String },
    Unrecognized { raw_status: String, raw: Value },
}

/// Where the artifact ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub path: PathBuf,
    pub bytes: u64,
}
