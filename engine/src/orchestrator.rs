use std::path::PathBuf;

use log::info;

use crate::{
    config::Config,
    download::Downloader,
    error::JobError,
    job::{DownloadResult, JobHandle, JobSpecification, JobStatus, Submission, TerminalStatus},
    media::MediaReference,
    poll::Poller,
    service::{DashScope, GenerationService},
};

/// Runs one job from submission to a file on disk. Every stage finishes
/// before the next one starts.
pub struct Orchestrator<S> {
    service: S,
    config: Config,
    poller: Poller,
    downloader: Downloader,
}

impl Orchestrator<DashScope> {
    pub fn dashscope(config: Config) -> Result<Self, JobError> {
        Ok(Self::new(DashScope::new(&config)?, config))
    }
}

impl<S: GenerationService> Orchestrator<S> {
    pub fn new(service: S, config: Config) -> Self {
        Self {
            poller: Poller::from_config(&config),
            downloader: Downloader::from_config(&config),
            service,
            config,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub async fn run(
        &self,
        prompt: &str,
        media: Option<MediaReference>,
    ) -> Result<DownloadResult, JobError> {
        self.run_to(prompt, media, None).await
    }

    pub async fn run_to(
        &self,
        prompt: &str,
        media: Option<MediaReference>,
        destination: Option<PathBuf>,
    ) -> Result<DownloadResult, JobError> {
        let spec = JobSpecification::build(prompt, media, &self.config)?;
        self.log_banner(&spec);

        info!("Submitting generation request");
        let handle = match self.service.submit(&spec).await? {
            Submission::Accepted(handle) => handle,
            Submission::Rejected(raw) => return Err(JobError::RemoteRejection { raw }),
        };
        info!("Task id: {handle}");

        self.resume(handle, destination).await
    }

    /// Waits for an already submitted task and downloads its artifact.
    pub async fn resume(
        &self,
        handle: JobHandle,
        destination: Option<PathBuf>,
    ) -> Result<DownloadResult, JobError> {
        match self.poller.wait(&self.service, &handle).await? {
            TerminalStatus::Succeeded { artifact_location } => {
                info!("Generation finished");
                self.downloader
                    .download(&self.service, &artifact_location, destination)
                    .await
            }
            TerminalStatus::Failed { detail } => Err(JobError::JobFailed { handle, detail }),
            TerminalStatus::Unrecognized { raw_status, raw } => Err(JobError::Unrecognized {
                handle,
                status: raw_status,
                raw,
            }),
        }
    }

    /// One status check, no waiting
    pub async fn status(&self, handle: &JobHandle) -> Result<JobStatus, JobError> {
        self.service.status(handle).await
    }

    fn log_banner(&self, spec: &JobSpecification) {
        info!("{}", "=".repeat(50));
        info!("WAN {} video generation", spec.kind());
        info!("model:      {}", spec.model());
        info!("resolution: {}", spec.dimensions());
        info!("duration:   {}s", spec.duration());
        info!("audio:      {}", self.config.audio);
        info!("prompt:     {}", spec.prompt());
        if let Some(media) = spec.media_reference() {
            info!("image:      {media}");
        }
        info!("{}", "=".repeat(50));
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::service::scripted::ScriptedService;

    fn orchestrator(service: ScriptedService, tmp: &TempDir) -> Orchestrator<ScriptedService> {
        let config = Config {
            output_dir: tmp.path().join("output"),
            ..Config::default()
        };
        Orchestrator::new(service, config)
    }

    #[tokio::test(start_paused = true)]
    async fn successful_run_downloads_the_artifact() -> Result<(), JobError> {
        let tmp = TempDir::new()?;
        let service = ScriptedService::statuses([
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Succeeded {
                artifact_location: "https://cdn/v.mp4".into(),
            },
        ]);
        let orch = orchestrator(service, &tmp);

        let result = orch.run("a cat walking slowly", None).await?;

        assert_eq!(result.bytes, b"fake video".len() as u64);
        assert!(result.path.starts_with(tmp.path().join("output")));
        assert_eq!(orch.service().ticks(), 3);
        assert_eq!(orch.service().downloads(), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn failed_job_is_not_downloaded() -> Result<(), JobError> {
        let tmp = TempDir::new()?;
        let service = ScriptedService::statuses([
            JobStatus::Pending,
            JobStatus::Failed {
                detail: "quota exceeded".into(),
            },
        ]);
        let orch = orchestrator(service, &tmp);

        let err = orch
            .run("a cat", Some(MediaReference::Url("https://x/cat.png".into())))
            .await
            .unwrap_err();

        match err {
            JobError::JobFailed { handle, detail } => {
                assert_eq!(handle, JobHandle::new("task-1"));
                assert_eq!(detail, "quota exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(orch.service().ticks(), 2);
        assert_eq!(orch.service().downloads(), 0);
        assert!(!tmp.path().join("output").exists());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn unrecognized_status_is_reported_separately() -> Result<(), JobError> {
        let tmp = TempDir::new()?;
        let service = ScriptedService::statuses([JobStatus::Unrecognized {
            raw_status: "UNKNOWN".into(),
            raw: json!({"output": {"task_status": "UNKNOWN"}}),
        }]);
        let orch = orchestrator(service, &tmp);

        let err = orch.run("a cat", None).await.unwrap_err();

        assert!(matches!(err, JobError::Unrecognized { ref status, .. } if status == "UNKNOWN"));
        assert_eq!(orch.service().downloads(), 0);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn download_failure_is_surfaced() -> Result<(), JobError> {
        let tmp = TempDir::new()?;
        let mut service = ScriptedService::statuses([JobStatus::Succeeded {
            artifact_location: "https://cdn/expired.mp4".into(),
        }]);
        service.artifact = Err(StatusCode::NOT_FOUND);
        let orch = orchestrator(service, &tmp);

        let err = orch.run("a cat", None).await.unwrap_err();

        assert!(matches!(
            err,
            JobError::DownloadFailure { status: StatusCode::NOT_FOUND, .. }
        ));
        assert_eq!(orch.service().downloads(), 1);
        assert!(!tmp.path().join("output").exists());
        Ok(())
    }

    #[tokio::test]
    async fn rejected_submission_is_never_polled() -> Result<(), JobError> {
        let tmp = TempDir::new()?;
        let raw = json!({"code": "InvalidParameter", "message": "bad size"});
        let mut service = ScriptedService::statuses([JobStatus::Running]);
        service.submission = Submission::Rejected(raw.clone());
        let orch = orchestrator(service, &tmp);

        let err = orch.run("a cat", None).await.unwrap_err();

        assert!(matches!(err, JobError::RemoteRejection { raw: ref r } if *r == raw));
        assert_eq!(orch.service().submits(), 1);
        assert_eq!(orch.service().ticks(), 0);
        assert_eq!(orch.service().downloads(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn empty_prompt_fails_before_submission() -> Result<(), JobError> {
        let tmp = TempDir::new()?;
        let orch = orchestrator(ScriptedService::statuses([JobStatus::Running]), &tmp);

        let err = orch.run("", None).await.unwrap_err();

        assert!(matches!(err, JobError::InvalidInput(_)));
        assert_eq!(orch.service().submits(), 0);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn resume_downloads_to_explicit_destination() -> Result<(), JobError> {
        let tmp = TempDir::new()?;
        let service = ScriptedService::statuses([JobStatus::Succeeded {
            artifact_location: "https://cdn/v.mp4".into(),
        }]);
        let orch = orchestrator(service, &tmp);
        let target = tmp.path().join("mine.mp4");

        let result = orch
            .resume(JobHandle::new("task-9"), Some(target.clone()))
            .await?;

        assert_eq!(result.path, target);
        assert_eq!(std::fs::read(&target)?, b"fake video");
        assert_eq!(orch.service().submits(), 0);
        Ok(())
    }
}
