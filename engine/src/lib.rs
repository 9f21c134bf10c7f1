//! Submit a WAN video generation job, wait for it and fetch the result.

pub mod config;
pub mod download;
pub mod error;
pub mod job;
pub mod media;
pub mod orchestrator;
pub mod poll;
pub mod service;

pub use config::Config;
pub use error::JobError;
pub use job::{
    DownloadResult, JobHandle, JobSpecification, JobState, JobStatus, Mode, ModeKind,
    TerminalStatus,
};
pub use media::MediaReference;
pub use orchestrator::Orchestrator;
