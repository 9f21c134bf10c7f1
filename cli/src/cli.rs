use std::path::PathBuf;

use indoc::indoc;

const AFTER_HELP: &str = indoc! {r#"
    Examples:
      T2V (text only):
        wan_video "A cat walking slowly"

      I2V (image + text):
        wan_video ./image.png "A cat walking slowly"
        wan_video https://example.com/img.png "A beautiful sunset"

    Settings are read from the config file and from WAN_* environment
    variables (a .env file in the working directory is picked up):
      WAN_API_KEY, WAN_MODEL_I2V, WAN_MODEL_T2V, WAN_RESOLUTION, WAN_SIZE,
      WAN_DURATION, WAN_AUDIO, WAN_PROMPT_EXTEND, WAN_SHOT_TYPE, WAN_OUTPUT_DIR,
      WAN_POLL_INTERVAL, WAN_POLL_TIMEOUT, WAN_MAX_POLL_RETRIES
"#};

/// Generate a video with WAN 2.6, from a prompt or from an image and a prompt
#[derive(Debug, clap::Parser)]
#[command(name = "wan_video", arg_required_else_help = true, after_help = AFTER_HELP)]
pub struct Cli {
    /// `PROMPT` for text-to-video, `IMAGE PROMPT` for image-to-video. IMAGE is
    /// a local file, a URL or a data URI.
    #[arg(
        value_name = "INPUT",
        num_args = 1..=2,
        required_unless_present_any = ["status", "resume"],
    )]
    pub inputs: Vec<String>,

    /// Where to save the video, defaults to a timestamped file in the output dir
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// RON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the status of an already submitted task and exit
    #[arg(long, value_name = "TASK_ID", conflicts_with_all = ["inputs", "resume"])]
    pub status: Option<String>,

    /// Wait for an already submitted task and download its video
    #[arg(long, value_name = "TASK_ID", conflicts_with = "inputs")]
    pub resume: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Action<'a> {
    Generate { image: Option<&'a str>, prompt: &'a str },
    Status(&'a str),
    Resume(&'a str),
}

impl Cli {
    pub fn action(&self) -> Action<'_> {
        if let Some(task) = &self.status {
            return Action::Status(task.as_str());
        }
        if let Some(task) = &self.resume {
            return Action::Resume(task.as_str());
        }
        match self.inputs.as_slice() {
            [image, prompt] => Action::Generate {
                image: Some(image.as_str()),
                prompt: prompt.as_str(),
            },
            [prompt] => Action::Generate {
                image: None,
                prompt: prompt.as_str(),
            },
            // an empty prompt is rejected when the job is built
            _ => Action::Generate {
                image: None,
                prompt: "",
            },
        }
    }
}
