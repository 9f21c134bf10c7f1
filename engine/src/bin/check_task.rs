use clap::Parser;
use color_eyre::Result;
use engine::{
    Config, JobHandle,
    service::{DashScope, GenerationService},
};

/// Prints the current status of a task once
#[derive(clap::Parser)]
struct Arg {
    task_id: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    pretty_env_logger::init();
    let Arg { task_id } = Arg::parse();

    let cfg = Config::load(None)?;
    let service = DashScope::new(&cfg)?;
    let status = service.status(&JobHandle::new(task_id)).await?;
    println!("{status:#?}");

    Ok(())
}
