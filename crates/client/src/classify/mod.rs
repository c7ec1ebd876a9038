//! Resource classification.
//!
//! `classify` is a pure function from a resource URL to the variant that
//! decides how (or whether) it is materialized. Precedence, first match wins:
//!
//! 1. on site, no recognized file suffix      -> `MirroredWebPage`
//! 2. on site, suffix `pdf` / `mp4` / `mp3`   -> `LocalFile`
//! 3. on site, suffix `jpg`                   -> `LocalImage`
//! 4. known broken interactive host           -> `InteractiveResource`
//! 5. suffix `swf`, any host                  -> `FlashResource`
//! 6. YouTube short or full link              -> `YouTubeVideo`
//! 7. Vimeo                                   -> `VimeoVideo`
//! 8. SoundCloud                              -> `SoundCloudAudio`
//! 9. anything else                           -> `Unknown`

pub mod materialize;

pub use materialize::{Materialization, Materializer, MirroredPage, mirror_page};

use url::Url;

use crate::fetch::{file_extension, url::host_matches};

/// Suffixes that mark a URL as a file rather than a page.
const FILE_SUFFIXES: &[&str] = &["pdf", "mp4", "mp3", "swf", "jpg"];

/// Third-party interactive hosts that no longer answer.
const BROKEN_INTERACTIVE_HOSTS: &[&str] = &["interactives.mped.org"];

const YOUTUBE_HOSTS: &[&str] = &["youtu.be", "youtube.com"];
const VIMEO_HOSTS: &[&str] = &["vimeo.com"];
const SOUNDCLOUD_HOSTS: &[&str] = &["soundcloud.com"];

/// How a resource URL is to be materialized. Each variant carries the origin URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedResource {
    LocalFile(String),
    LocalImage(String),
    MirroredWebPage(String),
    YouTubeVideo(String),
    VimeoVideo(String),
    SoundCloudAudio(String),
    FlashResource(String),
    InteractiveResource(String),
    Unknown(String),
}

impl ClassifiedResource {
    pub fn origin(&self) -> &str {
        match self {
            ClassifiedResource::LocalFile(u)
            | ClassifiedResource::LocalImage(u)
            | ClassifiedResource::MirroredWebPage(u)
            | ClassifiedResource::YouTubeVideo(u)
            | ClassifiedResource::VimeoVideo(u)
            | ClassifiedResource::SoundCloudAudio(u)
            | ClassifiedResource::FlashResource(u)
            | ClassifiedResource::InteractiveResource(u)
            | ClassifiedResource::Unknown(u) => u,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ClassifiedResource::LocalFile(_) => "file",
            ClassifiedResource::LocalImage(_) => "image",
            ClassifiedResource::MirroredWebPage(_) => "web page",
            ClassifiedResource::YouTubeVideo(_) => "youtube",
            ClassifiedResource::VimeoVideo(_) => "vimeo",
            ClassifiedResource::SoundCloudAudio(_) => "soundcloud",
            ClassifiedResource::FlashResource(_) => "flash",
            ClassifiedResource::InteractiveResource(_) => "interactive",
            ClassifiedResource::Unknown(_) => "unknown",
        }
    }

    /// Whether any materialization handler exists for this variant.
    pub fn is_supported(&self) -> bool {
        !matches!(
            self,
            ClassifiedResource::FlashResource(_)
                | ClassifiedResource::InteractiveResource(_)
                | ClassifiedResource::Unknown(_)
        )
    }
}

fn host_in(host: Option<&str>, hosts: &[&str]) -> bool {
    host.is_some_and(|h| hosts.iter().any(|candidate| host_matches(h, candidate)))
}

/// Classify a resource URL against the source site.
pub fn classify(url: &str, site: &Url) -> ClassifiedResource {
    let origin = url.trim().to_string();
    let parsed = Url::parse(&origin).ok();
    let host = parsed.as_ref().and_then(|u| u.host_str());
    let on_site = host_in(host, &[site.host_str().unwrap_or_default()]);
    let suffix = file_extension(&origin).filter(|ext| FILE_SUFFIXES.contains(&ext.as_str()));

    match suffix.as_deref() {
        None if on_site => ClassifiedResource::MirroredWebPage(origin),
        Some("pdf" | "mp4" | "mp3") if on_site => ClassifiedResource::LocalFile(origin),
        Some("jpg") if on_site => ClassifiedResource::LocalImage(origin),
        _ if host_in(host, BROKEN_INTERACTIVE_HOSTS) => ClassifiedResource::InteractiveResource(origin),
        Some("swf") => ClassifiedResource::FlashResource(origin),
        _ if host_in(host, YOUTUBE_HOSTS) => ClassifiedResource::YouTubeVideo(origin),
        _ if host_in(host, VIMEO_HOSTS) => ClassifiedResource::VimeoVideo(origin),
        _ if host_in(host, SOUNDCLOUD_HOSTS) => ClassifiedResource::SoundCloudAudio(origin),
        _ => ClassifiedResource::Unknown(origin),
    }
}
