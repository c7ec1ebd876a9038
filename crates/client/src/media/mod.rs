//! Third-party media platforms (YouTube, Vimeo, SoundCloud).
//!
//! A platform answers two questions: what licence does this media carry
//! (`probe`) and where did the downloaded file land (`download`). The licence
//! gate and the retry budget live in [`acquire`], so every platform shares
//! the same policy.

pub mod retry;
pub mod ytdlp;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

pub use retry::{IsRetryable, RetryPolicy, retry_with_backoff};
pub use ytdlp::YtDlp;

use edsite_core::AppConfig;

/// Container requested from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    /// MP4, capped at 720p.
    Video,
    /// MP3 audio track.
    Audio,
}

impl MediaFormat {
    pub fn extension(self) -> &'static str {
        match self {
            MediaFormat::Video => "mp4",
            MediaFormat::Audio => "mp3",
        }
    }
}

/// What a probe reports about a media URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaInfo {
    pub title: Option<String>,
    /// Licence string as published by the platform, if any.
    pub license: Option<String>,
}

/// Media platform failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("MEDIA_NETWORK: {0}")]
    Network(String),

    #[error("MEDIA_TRUNCATED: {0}")]
    ContentTooShort(String),

    #[error("MEDIA_EXTRACTOR: {0}")]
    Extractor(String),

    #[error("MEDIA_NOT_FOUND: {0}")]
    NotFound(String),

    /// The extractor binary could not be started at all.
    #[error("MEDIA_SPAWN: {0}")]
    Spawn(String),
}

impl IsRetryable for PlatformError {
    fn is_retryable(&self) -> bool {
        matches!(self, PlatformError::Network(_) | PlatformError::ContentTooShort(_) | PlatformError::Extractor(_))
    }
}

/// A media hosting platform that can describe and download a URL.
#[async_trait]
pub trait MediaPlatform: Send + Sync {
    async fn probe(&self, url: &str) -> Result<MediaInfo, PlatformError>;

    /// Download `url` into `dest_dir`, returning the produced file.
    async fn download(&self, url: &str, dest_dir: &Path, format: MediaFormat) -> Result<PathBuf, PlatformError>;

    fn name(&self) -> &'static str;
}

/// Licence gate, download switch and retry budget applied to every platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPolicy {
    pub download_enabled: bool,
    pub accepted_licenses: Vec<String>,
    /// Whether media without a published licence may be downloaded.
    pub accept_unspecified: bool,
    pub retry: RetryPolicy,
}

impl MediaPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            download_enabled: config.download_media,
            accepted_licenses: config.accepted_media_licenses.clone(),
            accept_unspecified: config.accept_unspecified_license,
            retry: RetryPolicy { max_attempts: config.media_retry_attempts, delay: config.media_retry_delay() },
        }
    }

    pub fn permits(&self, license: Option<&str>) -> bool {
        match license.map(str::trim).filter(|l| !l.is_empty()) {
            Some(license) => self.accepted_licenses.iter().any(|accepted| accepted == license),
            None => self.accept_unspecified,
        }
    }
}

impl Default for MediaPolicy {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Probe, gate and download one media URL.
///
/// Returns the produced file, or `None` when the licence is refused, downloads
/// are disabled, or every attempt failed. Never fails the caller.
pub async fn acquire(
    platform: &dyn MediaPlatform, policy: &MediaPolicy, url: &str, dest_dir: &Path, format: MediaFormat,
) -> Option<PathBuf> {
    let info = match platform.probe(url).await {
        Ok(info) => info,
        Err(e) => {
            tracing::info!(platform = platform.name(), url, error = %e, "media probe failed");
            return None;
        }
    };

    if !policy.permits(info.license.as_deref()) {
        tracing::info!(url, license = info.license.as_deref().unwrap_or("unspecified"), "media licence not accepted");
        return None;
    }

    if !policy.download_enabled {
        tracing::info!(url, "media download disabled");
        return None;
    }

    if let Err(e) = tokio::fs::create_dir_all(dest_dir).await {
        tracing::warn!(dir = %dest_dir.display(), error = %e, "could not create media directory");
        return None;
    }

    match retry_with_backoff(&policy.retry, || platform.download(url, dest_dir, format)).await {
        Ok(path) => {
            tracing::info!(url, file = %path.display(), "media downloaded");
            Some(path)
        }
        Err(e) => {
            tracing::warn!(platform = platform.name(), url, error = %e, "media download gave up");
            None
        }
    }
}
