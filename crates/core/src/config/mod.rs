//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (EDSITE_*)
//! 2. TOML config file (if EDSITE_CONFIG_FILE set or passed explicitly)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (EDSITE_*)
/// 2. TOML config file
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root of the source site. URLs on this host are "on site" and cached forever.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Subject identifiers, walked in declaration order by both traversal modes.
    #[serde(default = "default_subject_ids")]
    pub subject_ids: Vec<u32>,

    /// Maximum number of subjects walked in lesson mode (None = unbounded).
    #[serde(default = "default_subject_limit")]
    pub lesson_subject_limit: Option<usize>,

    /// Maximum number of lessons per subject (None = unbounded).
    #[serde(default)]
    pub lesson_item_limit: Option<usize>,

    /// Maximum number of subjects walked in resource mode (None = unbounded).
    #[serde(default = "default_subject_limit")]
    pub resource_subject_limit: Option<usize>,

    /// Maximum number of student resources per subject (None = unbounded).
    #[serde(default)]
    pub resource_item_limit: Option<usize>,

    /// Delay inserted between successive leaf page fetches, in milliseconds.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Path to the SQLite page cache.
    ///
    /// Set via EDSITE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Freshness window for pages outside the source site, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Directory receiving the catalog and its copied files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Staging directory for archive packages and media downloads.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Whether external video/audio is downloaded at all.
    #[serde(default = "default_true")]
    pub download_media: bool,

    /// Total attempts for one media download.
    #[serde(default = "default_media_retry_attempts")]
    pub media_retry_attempts: u32,

    /// Pause between media download attempts, in milliseconds.
    #[serde(default = "default_media_retry_delay_ms")]
    pub media_retry_delay_ms: u64,

    /// Platform licence strings treated as permissive enough to mirror.
    ///
    /// CONTENT-RIGHTS POLICY: the defaults accept the platform's standard
    /// licence. Operators who need a stricter policy should narrow this list
    /// and disable `accept_unspecified_license`.
    #[serde(default = "default_accepted_media_licenses")]
    pub accepted_media_licenses: Vec<String>,

    /// Whether media with no reported licence may be mirrored.
    #[serde(default = "default_true")]
    pub accept_unspecified_license: bool,

    /// Explicit path to the yt-dlp binary; discovered on PATH when unset.
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    #[serde(default = "default_channel_name")]
    pub channel_name: String,

    #[serde(default = "default_channel_source_id")]
    pub channel_source_id: String,

    #[serde(default = "default_channel_domain")]
    pub channel_domain: String,

    #[serde(default = "default_channel_language")]
    pub channel_language: String,

    /// Licence attached to every published artifact.
    #[serde(default = "default_license")]
    pub license: String,

    #[serde(default = "default_copyright_holder")]
    pub copyright_holder: String,
}

fn default_base_url() -> String {
    "http://edsitement.neh.gov".into()
}

fn default_subject_ids() -> Vec<u32> {
    vec![25, 21, 22, 23]
}

fn default_subject_limit() -> Option<usize> {
    Some(4)
}

fn default_request_delay_ms() -> u64 {
    200
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./edsite-cache.sqlite")
}

fn default_cache_ttl_secs() -> u64 {
    86_400
}

fn default_user_agent() -> String {
    "edsite-harvest/0.1".into()
}

fn default_max_bytes() -> usize {
    52_428_800 // 50MB
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./EDSITEment")
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("edsite-harvest")
}

fn default_media_retry_attempts() -> u32 {
    10
}

fn default_media_retry_delay_ms() -> u64 {
    500
}

fn default_accepted_media_licenses() -> Vec<String> {
    vec![
        "Standard YouTube License".into(),
        "Creative Commons Attribution license (reuse allowed)".into(),
    ]
}

fn default_channel_name() -> String {
    "EDSITEment".into()
}

fn default_channel_source_id() -> String {
    "edsitement".into()
}

fn default_channel_domain() -> String {
    "edsitement.neh.gov".into()
}

fn default_channel_language() -> String {
    "en".into()
}

fn default_license() -> String {
    "CC BY".into()
}

fn default_copyright_holder() -> String {
    "National Endowment for the Humanities".into()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            subject_ids: default_subject_ids(),
            lesson_subject_limit: default_subject_limit(),
            lesson_item_limit: None,
            resource_subject_limit: default_subject_limit(),
            resource_item_limit: None,
            request_delay_ms: default_request_delay_ms(),
            db_path: default_db_path(),
            cache_ttl_secs: default_cache_ttl_secs(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            output_dir: default_output_dir(),
            work_dir: default_work_dir(),
            download_media: true,
            media_retry_attempts: default_media_retry_attempts(),
            media_retry_delay_ms: default_media_retry_delay_ms(),
            accepted_media_licenses: default_accepted_media_licenses(),
            accept_unspecified_license: true,
            ytdlp_path: None,
            channel_name: default_channel_name(),
            channel_source_id: default_channel_source_id(),
            channel_domain: default_channel_domain(),
            channel_language: default_channel_language(),
            license: default_license(),
            copyright_holder: default_copyright_holder(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn media_retry_delay(&self) -> Duration {
        Duration::from_millis(self.media_retry_delay_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `EDSITE_`
    /// 2. TOML file from `config_file`, or `EDSITE_CONFIG_FILE` when not given
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        } else if let Ok(config_path) = std::env::var("EDSITE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("EDSITE_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
