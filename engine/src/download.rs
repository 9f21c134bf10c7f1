use std::path::{Path, PathBuf};

use chrono::Local;
use log::info;
use tokio::{
    fs::{self, File},
    io::{AsyncWriteExt, BufWriter},
};
use tokio_stream::StreamExt;

use crate::{
    config::Config,
    error::JobError,
    job::DownloadResult,
    service::{ArtifactStream, GenerationService},
};

/// Size of the blocks written to disk
pub const CHUNK_SIZE: usize = 8192;

const FILE_PREFIX: &str = "wan_video";
const FILE_EXTENSION: &str = "mp4";

/// Streams finished artifacts to disk.
///
/// A failed transfer leaves whatever was written so far on disk.
#[derive(Debug, Clone)]
pub struct Downloader {
    output_dir: PathBuf,
}

impl Downloader {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(&cfg.output_dir)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `<output_dir>/wan_video_<YYYYmmdd_HHMMSS>.mp4`
    pub fn timestamped_path(&self) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        self.output_dir
            .join(format!("{FILE_PREFIX}_{stamp}.{FILE_EXTENSION}"))
    }

    /// Picks the target path and makes sure its directory exists.
    pub async fn prepare_destination(
        &self,
        explicit: Option<PathBuf>,
    ) -> Result<PathBuf, JobError> {
        let path = explicit.unwrap_or_else(|| self.timestamped_path());
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await?;
        }
        Ok(path)
    }

    pub async fn download(
        &self,
        service: &(impl GenerationService + ?Sized),
        location: &str,
        destination: Option<PathBuf>,
    ) -> Result<DownloadResult, JobError> {
        info!("Downloading {location}");
        let stream = service.open_artifact(location).await?;
        let path = self.prepare_destination(destination).await?;
        let bytes = write_stream(stream, &path).await?;
        info!("Saved {bytes} bytes to {}", path.display());
        Ok(DownloadResult { path, bytes })
    }
}

/// Writes every chunk of `stream` to a new file at `path`, returning the
/// number of bytes written.
pub async fn write_stream(mut stream: ArtifactStream<'_>, path: &Path) -> Result<u64, JobError> {
    let file = File::create(path).await?;
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut written = 0;

    while let Some(chunk) = stream.try_next().await? {
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    writer.flush().await?;
    Ok(written)
}
