use color_eyre::Result;
use engine::{Config, JobHandle, JobStatus, MediaReference, Orchestrator};
use log::info;

use crate::cli::{Action, Cli};

pub mod cli;

/// Runs whatever the command line asked for. Only a successful generation or
/// resume prints a path on stdout.
pub async fn execute(args: &Cli, cfg: Config) -> Result<()> {
    let orchestrator = Orchestrator::dashscope(cfg)?;

    match args.action() {
        Action::Generate { image, prompt } => {
            let media = image.map(MediaReference::resolve).transpose()?;
            if let Some(image) = image {
                info!("Using image input: {image}");
            }
            let result = orchestrator
                .run_to(prompt, media, args.output.clone())
                .await?;
            println!("{}", result.path.display());
        }
        Action::Status(task) => {
            let status = orchestrator.status(&JobHandle::new(task)).await?;
            println!("{}", describe(&status));
        }
        Action::Resume(task) => {
            let result = orchestrator
                .resume(JobHandle::new(task), args.output.clone())
                .await?;
            println!("{}", result.path.display());
        }
    }

    Ok(())
}

fn describe(status: &JobStatus) -> String {
    match status {
        JobStatus::Succeeded { artifact_location } => {
            format!("{}: {artifact_location}", status.state())
        }
        JobStatus::Failed { detail } => format!("{}: {detail}", status.state()),
        JobStatus::Unrecognized { raw_status, .. } => {
            format!("{}: {raw_status}", status.state())
        }
        JobStatus::Pending | JobStatus::Running => status.state().to_string(),
    }
}
