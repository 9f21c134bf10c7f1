use std::{fmt, path::Path};

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Serialize;

use crate::error::JobError;

/// The image a media-to-media job starts from, in a form the service accepts
/// as `img_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MediaReference {
    /// read from a local file and inlined
    DataUri(String),
    Url(String),
    /// a `data:` URI handed to us as is
    Encoded(String),
}

impl MediaReference {
    /// Interprets a user supplied image argument: an existing local file is
    /// inlined as a data URI, `data:` input is passed through, anything else is
    /// treated as a remote URL.
    pub fn resolve(input: &str) -> Result<Self, JobError> {
        if input.trim().is_empty() {
            return Err(JobError::InvalidInput("the image argument is empty".into()));
        }
        let path = Path::new(input);
        if path.is_file() {
            Self::from_file(path)
        } else if input.starts_with("data:") {
            Ok(Self::Encoded(input.to_string()))
        } else {
            Ok(Self::Url(input.to_string()))
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, JobError> {
        let bytes = std::fs::read(path).map_err(|source| JobError::MediaRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::DataUri(format!(
            "data:{};base64,{}",
            mime_type(path),
            STANDARD.encode(bytes)
        )))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::DataUri(s) | Self::Url(s) | Self::Encoded(s) => s,
        }
    }
}

impl fmt::Display for MediaReference {
    // inlined images are far too long to print
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataUri(s) | Self::Encoded(s) => write!(f, "<data URI, {} bytes>", s.len()),
            Self::Url(s) => f.write_str(s),
        }
    }
}

fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}
