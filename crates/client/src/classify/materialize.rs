//! Per-variant materialization handlers.

use std::path::PathBuf;
use std::sync::Arc;

use scraper::{Html, Selector};
use url::Url;

use edsite_core::{Metadata, MetadataDefaults};

use super::ClassifiedResource;
use crate::archive::MaterializedFile;
use crate::extract::{DelinkOptions, delink_outer};
use crate::fetch::{PageSource, file_extension, is_same_site};
use crate::media::{self, MediaFormat, MediaPlatform, MediaPolicy};

/// Outcome of materializing one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialization {
    /// Record for the resource itself; `source_id` is its origin URL.
    pub metadata: Metadata,
    pub files: Vec<MaterializedFile>,
    /// Replacement index document, for mirrored pages.
    pub index_html: Option<String>,
}

/// Rewritten content of a mirrored page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirroredPage {
    /// De-linked, image-free content container.
    pub content_html: String,
    /// Same-site PDFs the page linked to, resolved.
    pub pdfs: Vec<String>,
    /// Image sources that were stripped, resolved.
    pub images: Vec<String>,
}

impl MirroredPage {
    pub fn index_document(&self) -> String {
        format!("<html><head><meta charset=\"UTF-8\"></head><body>{}</body></html>", self.content_html)
    }
}

/// Rewrite a page for mirroring.
///
/// `None` when the page has no content container or the container embeds a
/// Flash object.
pub fn mirror_page(html: &str, page_url: &Url) -> Option<MirroredPage> {
    let document = Html::parse_document(html);
    let content_sel = Selector::parse("div#content").expect("invalid selector");
    let flash_sel = Selector::parse(r#"object[type="application/x-shockwave-flash"]"#).expect("invalid selector");

    let content = document.select(&content_sel).next()?;
    if content.select(&flash_sel).next().is_some() {
        tracing::info!(url = %page_url, "mirrored page embeds flash");
        return None;
    }

    let delinked = delink_outer(content, DelinkOptions { strip_images: true });

    let pdfs = delinked
        .hrefs
        .iter()
        .filter_map(|href| page_url.join(href.trim()).ok())
        .filter(|url| is_same_site(url, page_url) && file_extension(url.as_str()).as_deref() == Some("pdf"))
        .map(|url| url.to_string())
        .collect();

    let images = delinked
        .images
        .iter()
        .filter_map(|src| page_url.join(src.trim()).ok())
        .map(|url| url.to_string())
        .collect();

    Some(MirroredPage { content_html: delinked.html, pdfs, images })
}

/// Turns classified resources into publishable files.
pub struct Materializer {
    source: Arc<dyn PageSource>,
    platform: Option<Arc<dyn MediaPlatform>>,
    policy: MediaPolicy,
    defaults: MetadataDefaults,
    media_dir: PathBuf,
}

impl Materializer {
    pub fn new(
        source: Arc<dyn PageSource>, platform: Option<Arc<dyn MediaPlatform>>, policy: MediaPolicy,
        defaults: MetadataDefaults, media_dir: impl Into<PathBuf>,
    ) -> Self {
        Self { source, platform, policy, defaults, media_dir: media_dir.into() }
    }

    /// Materialize `resource`. `None` means nothing to publish; never an error.
    pub async fn materialize(&self, resource: &ClassifiedResource, description: &str) -> Option<Materialization> {
        let origin = resource.origin();
        match resource {
            ClassifiedResource::LocalFile(_) | ClassifiedResource::LocalImage(_) => {
                let metadata = self.defaults.record(origin, description);
                let files = vec![MaterializedFile::url(origin, Some(metadata.clone()))];
                Some(Materialization { metadata, files, index_html: None })
            }
            ClassifiedResource::MirroredWebPage(_) => self.mirror(origin, description).await,
            ClassifiedResource::YouTubeVideo(_) | ClassifiedResource::VimeoVideo(_) => {
                self.media(origin, description, MediaFormat::Video).await
            }
            ClassifiedResource::SoundCloudAudio(_) => self.media(origin, description, MediaFormat::Audio).await,
            ClassifiedResource::FlashResource(_)
            | ClassifiedResource::InteractiveResource(_)
            | ClassifiedResource::Unknown(_) => {
                tracing::info!(kind = resource.kind_name(), url = origin, "resource not materialized");
                None
            }
        }
    }

    async fn mirror(&self, url: &str, description: &str) -> Option<Materialization> {
        let html = match self.source.fetch_text(url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::info!(url, error = %e, "mirror fetch failed");
                return None;
            }
        };
        let page_url = Url::parse(url).ok()?;
        let mirrored = mirror_page(&html, &page_url)?;

        for image in &mirrored.images {
            tracing::debug!(page = url, image = %image, "image dropped from mirrored page");
        }

        let metadata = self.defaults.record(url, description);
        let files = mirrored
            .pdfs
            .iter()
            .map(|pdf| MaterializedFile::url(pdf, Some(metadata.with_source(pdf))))
            .collect();

        Some(Materialization { metadata, files, index_html: Some(mirrored.index_document()) })
    }

    async fn media(&self, url: &str, description: &str, format: MediaFormat) -> Option<Materialization> {
        let Some(platform) = self.platform.as_deref() else {
            tracing::info!(url, "no media platform configured");
            return None;
        };
        let path = media::acquire(platform, &self.policy, url, &self.media_dir, format).await?;

        Some(Materialization {
            metadata: self.defaults.record(url, description),
            files: vec![MaterializedFile::local(path, None)],
            index_html: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::SourceRef;
    use crate::classify::classify;
    use crate::fetch::memory::MemorySource;
    use crate::media::RetryPolicy;
    use crate::media::fake::FakePlatform;
    use std::time::Duration;

    const MIRROR: &str = r#"
        <html><body>
            <div id="header"><a href="/">Home</a></div>
            <div id="content">
                <h1>Ancient Maps</h1>
                <p>See <a href="/sites/default/files/atlas.pdf">the atlas</a>,
                   <a href="http://other.org/x.pdf">elsewhere</a> and <a href="/maps">more maps</a>.</p>
                <img src="/sites/default/files/map.jpg">
            </div>
        </body></html>
    "#;

    fn site() -> Url {
        Url::parse("http://edsitement.neh.gov").unwrap()
    }

    fn policy() -> MediaPolicy {
        MediaPolicy {
            download_enabled: true,
            accepted_licenses: vec!["Standard YouTube License".into()],
            accept_unspecified: true,
            retry: RetryPolicy { max_attempts: 3, delay: Duration::from_millis(1) },
        }
    }

    fn materializer(source: MemorySource, platform: Option<FakePlatform>, dir: &std::path::Path) -> Materializer {
        Materializer::new(
            Arc::new(source),
            platform.map(|p| Arc::new(p) as Arc<dyn MediaPlatform>),
            policy(),
            MetadataDefaults::default(),
            dir,
        )
    }

    #[test]
    fn test_mirror_page_rewrites_content() {
        let page_url = Url::parse("http://edsitement.neh.gov/websites/ancient-maps").unwrap();
        let mirrored = mirror_page(MIRROR, &page_url).unwrap();
        assert!(mirrored.content_html.starts_with(r#"<div id="content">"#));
        assert!(!mirrored.content_html.contains("<a "));
        assert!(!mirrored.content_html.contains("<img"));
        assert!(!mirrored.content_html.contains("Home"));
        assert_eq!(mirrored.pdfs, vec!["http://edsitement.neh.gov/sites/default/files/atlas.pdf"]);
        assert_eq!(mirrored.images, vec!["http://edsitement.neh.gov/sites/default/files/map.jpg"]);
    }

    #[test]
    fn test_mirror_page_rejects_flash() {
        let html = r#"<div id="content"><object type="application/x-shockwave-flash" data="a.swf"></object></div>"#;
        assert!(mirror_page(html, &site()).is_none());
        assert!(mirror_page("<div id='other'></div>", &site()).is_none());
    }

    #[tokio::test]
    async fn test_local_file_is_referenced_by_url() {
        let dir = tempfile::tempdir().unwrap();
        let m = materializer(MemorySource::new(), None, dir.path());
        let url = "http://edsitement.neh.gov/sites/default/files/doc.pdf";

        let out = m.materialize(&classify(url, &site()), "A document").await.unwrap();
        assert_eq!(out.metadata.source_id, url);
        assert_eq!(out.metadata.description, "A document");
        assert_eq!(out.files.len(), 1);
        assert_eq!(out.files[0].source, SourceRef::Url(url.into()));
        assert_eq!(out.files[0].label, "doc");
        assert!(out.index_html.is_none());
    }

    #[tokio::test]
    async fn test_mirrored_page_materializes_nested_pdfs() {
        let dir = tempfile::tempdir().unwrap();
        let url = "http://edsitement.neh.gov/websites/ancient-maps";
        let m = materializer(MemorySource::new().page(url, MIRROR), None, dir.path());

        let out = m.materialize(&classify(url, &site()), "").await.unwrap();
        assert_eq!(out.metadata.source_id, url);
        assert_eq!(out.files.len(), 1);
        let pdf = "http://edsitement.neh.gov/sites/default/files/atlas.pdf";
        assert_eq!(out.files[0].metadata.as_ref().unwrap().source_id, pdf);
        assert!(out.index_html.unwrap().contains("Ancient Maps"));
    }

    #[tokio::test]
    async fn test_mirror_fetch_failure_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let url = "http://edsitement.neh.gov/websites/gone";
        let m = materializer(MemorySource::new().failing(url, 500), None, dir.path());
        assert!(m.materialize(&classify(url, &site()), "").await.is_none());
    }

    #[tokio::test]
    async fn test_video_download() {
        let dir = tempfile::tempdir().unwrap();
        let platform = FakePlatform::new(Some("Standard YouTube License"), 2);
        let m = materializer(MemorySource::new(), Some(platform), dir.path());

        let out = m.materialize(&classify("https://youtu.be/abc123", &site()), "").await.unwrap();
        assert_eq!(out.metadata.source_id, "https://youtu.be/abc123");
        assert_eq!(out.files[0].source, SourceRef::Local(dir.path().join("clip.mp4")));
        assert!(out.files[0].metadata.is_none());
    }

    #[tokio::test]
    async fn test_audio_download_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let platform = FakePlatform::new(None, 3);
        let m = materializer(MemorySource::new(), Some(platform), dir.path());
        assert!(m.materialize(&classify("https://soundcloud.com/neh/talk", &site()), "").await.is_none());
    }

    #[tokio::test]
    async fn test_unsupported_variants_yield_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = MemorySource::new();
        let m = materializer(source, Some(FakePlatform::new(None, 0)), dir.path());
        for url in ["https://example.org/widget.swf", "http://interactives.mped.org/x", "https://www.loc.gov/item/1"] {
            assert!(m.materialize(&classify(url, &site()), "").await.is_none());
        }
    }

    #[tokio::test]
    async fn test_video_without_platform() {
        let dir = tempfile::tempdir().unwrap();
        let m = materializer(MemorySource::new(), None, dir.path());
        assert!(m.materialize(&classify("https://vimeo.com/1", &site()), "").await.is_none());
    }
}
