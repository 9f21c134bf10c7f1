use std::{fs, path::Path, path::PathBuf, time::Duration};

use color_eyre::{
    Result,
    eyre::{WrapErr as _, eyre},
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://dashscope-intl.aliyuncs.com/api/v1";
const CONFIG_FILE_NAME: &str = "wan_video.ron";

/// Process wide settings. Built once at startup and handed to every component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    /// model used when an image is supplied
    pub model_i2v: String,
    /// model used for text only requests
    pub model_t2v: String,
    /// I2V output resolution: 480P, 720P or 1080P
    pub resolution: String,
    /// T2V frame size, e.g. `1280*720`
    pub size: String,
    /// clip length in seconds
    pub duration: u32,
    pub audio: bool,
    pub prompt_extend: bool,
    pub shot_type: String,
    pub output_dir: PathBuf,
    #[serde(with = "secs")]
    pub poll_interval: Duration,
    /// overall limit for the polling loop, `None` polls until a terminal state
    #[serde(with = "opt_secs")]
    pub poll_timeout: Option<Duration>,
    /// consecutive transport errors tolerated while polling
    pub max_poll_retries: u32,
    /// limit for a single submit or status request, and for connecting when
    /// downloading
    #[serde(with = "secs")]
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.into(),
            model_i2v: "wan2.6-i2v".into(),
            model_t2v: "wan2.6-t2v".into(),
            resolution: "720P".into(),
            size: "1280*720".into(),
            duration: 10,
            audio: true,
            prompt_extend: true,
            shot_type: "single".into(),
            output_dir: PathBuf::from("./output"),
            poll_interval: Duration::from_secs(10),
            poll_timeout: None,
            max_poll_retries: 5,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Reads a RON config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let src = fs::read_to_string(path).wrap_err_with(|| format!("reading {path:?}"))?;
        ron::from_str(&src).wrap_err_with(|| format!("parsing {path:?}"))
    }

    /// Defaults, then the config file (explicit path or the per user one if it
    /// exists), then `WAN_*` environment variables.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut cfg = match explicit_path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(key) = lookup("WAN_API_KEY").filter(|k| !k.is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(v) = lookup("WAN_API_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = lookup("WAN_MODEL_I2V") {
            self.model_i2v = v;
        }
        if let Some(v) = lookup("WAN_MODEL_T2V") {
            self.model_t2v = v;
        }
        if let Some(v) = lookup("WAN_RESOLUTION") {
            self.resolution = v;
        }
        if let Some(v) = lookup("WAN_SIZE") {
            self.size = v;
        }
        if let Some(v) = lookup("WAN_DURATION") {
            self.duration = parse_num("WAN_DURATION", &v)?;
        }
        if let Some(v) = lookup("WAN_AUDIO") {
            self.audio = parse_flag(&v);
        }
        if let Some(v) = lookup("WAN_PROMPT_EXTEND") {
            self.prompt_extend = parse_flag(&v);
        }
        if let Some(v) = lookup("WAN_SHOT_TYPE") {
            self.shot_type = v;
        }
        if let Some(v) = lookup("WAN_OUTPUT_DIR") {
            self.output_dir = v.into();
        }
        if let Some(v) = lookup("WAN_POLL_INTERVAL") {
            self.poll_interval = Duration::from_secs(parse_num("WAN_POLL_INTERVAL", &v)?);
        }
        if let Some(v) = lookup("WAN_POLL_TIMEOUT") {
            let secs: u64 = parse_num("WAN_POLL_TIMEOUT", &v)?;
            self.poll_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(v) = lookup("WAN_MAX_POLL_RETRIES") {
            self.max_poll_retries = parse_num("WAN_MAX_POLL_RETRIES", &v)?;
        }
        if let Some(v) = lookup("WAN_REQUEST_TIMEOUT") {
            self.request_timeout = Duration::from_secs(parse_num("WAN_REQUEST_TIMEOUT", &v)?);
        }
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(dirs::config_local_dir()?.join(CONFIG_FILE_NAME))
}

// Anything but "true" counts as false
fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| eyre!("{key} must be a non-negative integer, got `{value}`"))
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

mod opt_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}
