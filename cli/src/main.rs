use clap::Parser;
use color_eyre::{Result, eyre::eyre};
use engine::Config;
use wan_video::{cli::Cli, execute};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();
    dotenvy::dotenv().ok();
    init_logging();

    let cfg = Config::load(args.config.as_deref())?;

    // dropping the run future is the only way to stop a long poll
    tokio::select! {
        res = execute(&args, cfg) => res,
        _ = tokio::signal::ctrl_c() => Err(eyre!("Interrupted, the task keeps running remotely")),
    }
}

/// Progress goes through the logger, so default to `info` unless RUST_LOG says
/// otherwise.
fn init_logging() {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();
}
