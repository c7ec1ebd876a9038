//! `yt-dlp` backed media platform.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use super::{MediaFormat, MediaInfo, MediaPlatform, PlatformError};

const BINARY: &str = "yt-dlp";

/// Best MP4 at or below 720p, merged with the best m4a track when split.
const VIDEO_FORMAT: &str =
    "bestvideo[height<=720][ext=mp4]+bestaudio[ext=m4a]/best[height<=720][ext=mp4]/best[height<=720]";

/// Drives the external `yt-dlp` binary for YouTube, Vimeo and SoundCloud.
pub struct YtDlp {
    binary_path: PathBuf,
}

impl YtDlp {
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find `yt-dlp` in PATH.
    pub fn from_path() -> Option<Self> {
        which::which(BINARY).ok().map(Self::new)
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    async fn run(&self, args: &[&str]) -> Result<String, PlatformError> {
        let output = Command::new(&self.binary_path)
            .args(args)
            .output()
            .await
            .map_err(|e| PlatformError::Spawn(format!("failed to execute {}: {}", self.binary_path.display(), e)))?;

        if !output.status.success() {
            return Err(classify_stderr(&String::from_utf8_lossy(&output.stderr)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl MediaPlatform for YtDlp {
    async fn probe(&self, url: &str) -> Result<MediaInfo, PlatformError> {
        let stdout = self.run(&["--dump-single-json", "--skip-download", "--no-warnings", url]).await?;
        parse_info(&stdout)
    }

    async fn download(&self, url: &str, dest_dir: &Path, format: MediaFormat) -> Result<PathBuf, PlatformError> {
        let template = dest_dir.join("%(id)s.%(ext)s");
        let template = template.to_string_lossy();

        let mut args = vec!["--no-warnings", "--no-progress", "--restrict-filenames", "--print", "after_move:filepath"];
        match format {
            MediaFormat::Video => args.extend(["-f", VIDEO_FORMAT, "--merge-output-format", "mp4"]),
            MediaFormat::Audio => args.extend(["-x", "--audio-format", "mp3"]),
        }
        args.extend(["-o", template.as_ref(), url]);

        let stdout = self.run(&args).await?;
        let path = stdout
            .lines()
            .map(str::trim)
            .rfind(|line| !line.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| PlatformError::Extractor(format!("no output file reported for {url}")))?;

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            Ok(path)
        } else {
            Err(PlatformError::NotFound(format!("reported file {} is missing", path.display())))
        }
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

fn parse_info(json: &str) -> Result<MediaInfo, PlatformError> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| PlatformError::Extractor(format!("unreadable media info: {e}")))?;
    let field = |name: &str| value.get(name).and_then(|v| v.as_str()).map(str::to_string);
    Ok(MediaInfo { title: field("title"), license: field("license") })
}

/// Map extractor diagnostics onto the retry taxonomy.
fn classify_stderr(stderr: &str) -> PlatformError {
    let message = stderr.lines().rfind(|l| !l.trim().is_empty()).unwrap_or("extractor failed").trim().to_string();
    let lower = stderr.to_lowercase();

    if lower.contains("content too short") || lower.contains("incomplete read") {
        PlatformError::ContentTooShort(message)
    } else if lower.contains("video unavailable")
        || lower.contains("http error 404")
        || lower.contains("does not exist")
        || lower.contains("private video")
    {
        PlatformError::NotFound(message)
    } else if lower.contains("timed out")
        || lower.contains("connection")
        || lower.contains("urlopen error")
        || lower.contains("temporary failure")
        || lower.contains("network")
    {
        PlatformError::Network(message)
    } else {
        PlatformError::Extractor(message)
    }
}
