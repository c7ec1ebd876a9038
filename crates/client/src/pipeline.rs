//! Pipeline driver: walk, extract, classify, materialize, publish.
//!
//! Units are processed strictly one after another. A unit's failure is
//! logged and counted; it never stops the walk. The catalog cursor is
//! restored to its pre-unit depth after every unit, whatever the outcome.

use std::ops::AddAssign;
use std::sync::Arc;

use html_escape::encode_double_quoted_attribute;
use serde::Serialize;
use url::Url;

use edsite_core::{Error, HierarchyPath, Metadata, MetadataDefaults};

use crate::archive::{Assembler, Catalog, ContentKind, MaterializedFile, RESOURCES_LABEL, SourceRef};
use crate::classify::{Materialization, Materializer, classify};
use crate::extract::{HeroImage, LessonPage, StudentResourcePage};
use crate::fetch::{PageSource, file_name, file_stem};
use crate::walker::{LeafPage, WalkConfig, WalkMode, Walker};

/// Unit counts of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub published: usize,
    /// Nothing to publish, or the leaf page could not be fetched.
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    fn record(&mut self, leaf: &LeafPage, outcome: Result<UnitOutcome, Error>) {
        match outcome {
            Ok(UnitOutcome::Published) => self.published += 1,
            Ok(UnitOutcome::Skipped) => self.skipped += 1,
            Err(e) if e.is_transport() => {
                tracing::warn!(url = %leaf.url, error = %e, "leaf page unavailable; skipped");
                self.skipped += 1;
            }
            Err(e) => {
                tracing::error!(url = %leaf.url, path = %leaf.path, error = %e, "unit failed");
                self.failed += 1;
            }
        }
    }
}

impl AddAssign for RunSummary {
    fn add_assign(&mut self, other: Self) {
        self.published += other.published;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

enum UnitOutcome {
    Published,
    Skipped,
}

pub struct Pipeline<C: Catalog> {
    source: Arc<dyn PageSource>,
    walk: WalkConfig,
    assembler: Assembler<C>,
    materializer: Materializer,
    defaults: MetadataDefaults,
}

impl<C: Catalog> Pipeline<C> {
    pub fn new(
        source: Arc<dyn PageSource>, walk: WalkConfig, assembler: Assembler<C>, materializer: Materializer,
        defaults: MetadataDefaults,
    ) -> Self {
        Self { source, walk, assembler, materializer, defaults }
    }

    pub fn assembler(&self) -> &Assembler<C> {
        &self.assembler
    }

    pub fn into_catalog(self) -> C {
        self.assembler.into_catalog()
    }

    /// Run each mode in turn.
    pub async fn run(&mut self, modes: &[WalkMode]) -> RunSummary {
        let mut summary = RunSummary::default();
        for &mode in modes {
            summary += self.run_mode(mode).await;
        }
        summary
    }

    pub async fn run_mode(&mut self, mode: WalkMode) -> RunSummary {
        let mut walker = Walker::new(self.source.clone(), self.walk.clone(), mode);
        let mut summary = RunSummary::default();

        while let Some(leaf) = walker.next_leaf().await {
            let depth = self.assembler.cursor().depth();
            let outcome = match mode {
                WalkMode::Lessons => self.process_lesson(&leaf).await,
                WalkMode::Resources => self.process_student_resource(&leaf).await,
            };
            self.assembler.restore_cursor(depth);
            summary.record(&leaf, outcome);
        }

        tracing::info!(
            ?mode,
            published = summary.published,
            skipped = summary.skipped,
            failed = summary.failed,
            "traversal finished"
        );
        summary
    }

    async fn process_lesson(&mut self, leaf: &LeafPage) -> Result<UnitOutcome, Error> {
        let html = self.source.fetch_text(&leaf.url).await?;
        let page_url = Url::parse(&leaf.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let lesson = LessonPage::parse(&html, &page_url);

        let title = lesson.title.clone().unwrap_or_else(|| url_title(&page_url));
        let path = leaf.path.child(title);
        tracing::info!(path = %path, sections = lesson.sections.len(), "lesson");

        let metadata = self.defaults.record(&leaf.url, "");
        let mut unit = self.assembler.begin_unit(&path)?;
        for (filename, section) in lesson.parts() {
            unit.append_part(filename, &section.to_document());
        }
        unit.write_index(&lesson.menu.index_document());

        let mut resources: Vec<MaterializedFile> = lesson
            .panel
            .pdf_links
            .iter()
            .map(|pdf| MaterializedFile {
                source: SourceRef::Url(pdf.url.clone()),
                label: pdf.display_name(),
                metadata: Some(metadata.with_source(&pdf.url)),
            })
            .collect();

        match &lesson.panel.hero_image {
            Some(hero) if hero.has_copyright => {
                tracing::info!(url = %hero.url, credits = %hero.credits_html, "copyrighted image skipped");
            }
            Some(hero) => match self.stage_hero_image(&path, hero, &metadata).await {
                Ok(Some(media)) => resources.push(media),
                Ok(None) => {}
                Err(e) => tracing::warn!(url = %hero.url, error = %e, "hero image not staged"),
            },
            None => {}
        }

        for link in &lesson.panel.external_links {
            tracing::debug!(url = %link, "student resource link");
        }

        self.assembler.publish(unit, ContentKind::Html5, &metadata, &resources)?;
        Ok(UnitOutcome::Published)
    }

    /// Package the hero image with its credits as its own media unit.
    async fn stage_hero_image(
        &mut self, path: &HierarchyPath, hero: &HeroImage, metadata: &Metadata,
    ) -> Result<Option<MaterializedFile>, Error> {
        let name = file_name(&hero.url);
        if name.is_empty() {
            return Ok(None);
        }
        let stem = file_stem(&hero.url);

        let mut media = self.assembler.begin_unit(&path.child(RESOURCES_LABEL).child(stem.as_str()))?;
        let image = SourceRef::Url(hero.url.clone());
        if let Err(e) = self.assembler.attach_binary(&mut media, &image, &name).await {
            tracing::warn!(url = %hero.url, error = %e, "hero image fetch failed");
            return Ok(None);
        }

        let name_attr = encode_double_quoted_attribute(&name);
        media.write_index(&format!(
            "<html><head><meta charset=\"UTF-8\"></head><body>\
             <img alt=\"{name_attr}\" src=\"files/{name_attr}\">{}</body></html>",
            hero.credits_html
        ));

        let package = media.finalize()?;
        if !package.exists() {
            return Ok(None);
        }
        Ok(Some(MaterializedFile {
            source: SourceRef::Local(package.file),
            label: stem,
            metadata: Some(metadata.with_source(&hero.url)),
        }))
    }

    async fn process_student_resource(&mut self, leaf: &LeafPage) -> Result<UnitOutcome, Error> {
        let html = self.source.fetch_text(&leaf.url).await?;
        let page_url = Url::parse(&leaf.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let page = StudentResourcePage::parse(&html, &page_url);

        let Some(view_more) = page.view_more.as_deref() else {
            tracing::info!(url = %leaf.url, "student resource without a linked resource");
            return Ok(UnitOutcome::Skipped);
        };

        let resource = classify(view_more, &self.walk.site);
        tracing::info!(kind = resource.kind_name(), url = view_more, "student resource");
        let Some(materialized) = self.materializer.materialize(&resource, &page.description).await else {
            return Ok(UnitOutcome::Skipped);
        };

        let title = page.title.clone().unwrap_or_else(|| url_title(&page_url));
        let path = leaf.path.child(title);
        let files = materialized.files.clone();
        let result = self.publish_student_resource(&path, &page, materialized).await;
        if result.is_err() {
            self.assembler.discard(&files);
        }
        result.map(|()| UnitOutcome::Published)
    }

    async fn publish_student_resource(
        &mut self, path: &HierarchyPath, page: &StudentResourcePage, materialized: Materialization,
    ) -> Result<(), Error> {
        let mut unit = self.assembler.begin_unit(path)?;

        let mut image_attached = false;
        if let (Some(url), Some(name)) = (&page.image_url, page.image_file_name()) {
            match self.assembler.attach_binary(&mut unit, &SourceRef::Url(url.clone()), &name).await {
                Ok(()) => image_attached = true,
                Err(e) => tracing::warn!(url = %url, error = %e, "student resource image not attached"),
            }
        }

        let index = match materialized.index_html {
            Some(index) => index,
            None if image_attached => page.index_document(),
            None => StudentResourcePage { image_url: None, ..page.clone() }.index_document(),
        };
        unit.write_index(&index);

        let mut metadata = materialized.metadata;
        metadata.thumbnail = page.image_url.clone();
        self.assembler.publish(unit, ContentKind::Html5, &metadata, &materialized.files)
    }
}

/// Last non-empty path segment, for pages without a usable title.
fn url_title(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ChannelInfo, ManifestCatalog, UNIT_LABEL};
    use crate::fetch::memory::MemorySource;
    use crate::media::MediaPolicy;
    use crate::walker::{Bounds, LESSON_ROOT, RESOURCE_ROOT, resource_listing_url};
    use std::io::Read;
    use std::path::Path;
    use std::time::Duration;

    const SITE: &str = "http://edsitement.neh.gov";
    const PDF: &str = "http://edsitement.neh.gov/sites/default/files/worksheet.pdf";
    const HERO: &str = "http://edsitement.neh.gov/sites/default/files/achilles.jpg";

    const LANDING: &str = r#"<h3 id="node-25"><a href="/subject/literature">Literature</a></h3>"#;

    fn listing(lessons: &[&str]) -> String {
        let links: String = lessons
            .iter()
            .map(|l| format!(r#"<div class="lesson-plan-link"><a href="/lesson-plan/{l}">{l}</a></div>"#))
            .collect();
        format!(r#"<h2 class="subject-area">Literature</h2>{links}"#)
    }

    fn lesson(title: &str, caption: &str) -> String {
        format!(
            r#"<html><body>
                <div id="description"><h1>{title}</h1></div>
                <div id="sect-thelesson">
                    <div id="sect-introduction">
                        <h4>Introduction</h4><div class="text"><p>Sing, <a href="/muse">Muse</a>.</p></div>
                    </div>
                    <div id="sect-background"><h4>Background</h4><div class="text"><p>Troy.</p></div></div>
                </div>
                <div id="sect-resources">
                    <li class="lesson-image"><img src="/sites/default/files/achilles.jpg"><p>{caption}</p></li>
                    <a href="/sites/default/files/worksheet.pdf">Worksheet</a>
                    <dd id="student-resources"><a href="http://www.perseus.tufts.edu/">Perseus</a></dd>
                </div>
            </body></html>"#
        )
    }

    fn lesson_site() -> MemorySource {
        MemorySource::new()
            .page("http://edsitement.neh.gov/lesson-plans", LANDING)
            .binary(HERO, b"\xff\xd8jpeg")
    }

    fn walk_config() -> WalkConfig {
        WalkConfig {
            site: Url::parse(SITE).unwrap(),
            subject_ids: vec![25],
            lesson_bounds: Bounds::default(),
            resource_bounds: Bounds::default(),
            delay: Duration::ZERO,
        }
    }

    fn pipeline(source: MemorySource, work: &Path, out: &Path) -> Pipeline<ManifestCatalog> {
        let source: Arc<dyn PageSource> = Arc::new(source);
        let channel = ChannelInfo {
            name: "EDSITEment".into(),
            source_id: "edsitement".into(),
            domain: "edsitement.neh.gov".into(),
            language: "en".into(),
        };
        let catalog = ManifestCatalog::open(out, channel).unwrap();
        let assembler = Assembler::new(work, "EDSITEment", catalog, source.clone()).unwrap();
        let materializer = Materializer::new(
            source.clone(),
            None,
            MediaPolicy::default(),
            MetadataDefaults::default(),
            work.join("media"),
        );
        Pipeline::new(source, walk_config(), assembler, materializer, MetadataDefaults::default())
    }

    fn zip_entries(file: &Path) -> Vec<(String, String)> {
        let mut archive = zip::ZipArchive::new(std::fs::File::open(file).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut entry = archive.by_index(i).unwrap();
                let mut body = Vec::new();
                entry.read_to_end(&mut body).unwrap();
                (entry.name().to_string(), String::from_utf8_lossy(&body).into_owned())
            })
            .collect()
    }

    #[tokio::test]
    async fn test_lesson_end_to_end() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let source = lesson_site()
            .page("http://edsitement.neh.gov/subject/literature", &listing(&["iliad"]))
            .page("http://edsitement.neh.gov/lesson-plan/iliad", &lesson("The Iliad", "Public domain."));

        let mut pipeline = pipeline(source, work.path(), out.path());
        let summary = pipeline.run(&[WalkMode::Lessons]).await;
        assert_eq!(summary, RunSummary { published: 1, skipped: 0, failed: 0 });

        let (enters, leaves) = pipeline.assembler().cursor().counts();
        assert_eq!(enters, leaves);
        assert_eq!(pipeline.assembler().cursor().depth(), 0);

        let catalog = pipeline.into_catalog();
        let entries = catalog.entries();
        let base = format!("EDSITEment/{LESSON_ROOT}/Literature/The Iliad");
        assert_eq!(entries.len(), 4);

        assert_eq!((entries[0].path.as_str(), entries[0].label.as_str()), (base.as_str(), UNIT_LABEL));
        assert_eq!(entries[0].kind, ContentKind::Html5);
        assert_eq!(entries[0].metadata.source_id, "http://edsitement.neh.gov/lesson-plan/iliad");

        assert_eq!((entries[1].label.as_str(), entries[1].kind), (RESOURCES_LABEL, ContentKind::Topic));

        let resources = format!("{base}/{RESOURCES_LABEL}");
        assert_eq!(entries[2].path, resources);
        assert_eq!(entries[2].label, "worksheet");
        assert_eq!(entries[2].kind, ContentKind::Document);
        assert_eq!(entries[2].source.as_deref(), Some(PDF));
        assert_eq!(entries[2].metadata.source_id, PDF);

        assert_eq!(entries[3].path, resources);
        assert_eq!(entries[3].label, "achilles");
        assert_eq!(entries[3].kind, ContentKind::Html5);
        assert_eq!(entries[3].metadata.source_id, HERO);

        let lesson_zip = out.path().join(entries[0].source.as_deref().unwrap());
        let files = zip_entries(&lesson_zip);
        let names: Vec<&str> = files.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["index.html", "files/introduction.html", "files/background.html"]);
        assert!(files[0].1.contains(r#"<a href="files/introduction.html">Introduction</a>"#));
        assert!(files[0].1.contains("files/the_basics.html"));
        assert!(files[1].1.contains("<h4>Introduction</h4><p>Sing, Muse.</p>"));

        let media_zip = out.path().join(entries[3].source.as_deref().unwrap());
        let media = zip_entries(&media_zip);
        assert_eq!(media[1].0, "files/achilles.jpg");
        assert!(media[0].1.contains("Public domain."));

        let staged: Vec<_> = std::fs::read_dir(work.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().is_file())
            .collect();
        assert!(staged.is_empty());
    }

    #[tokio::test]
    async fn test_copyrighted_hero_image_is_suppressed() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let source = lesson_site()
            .page("http://edsitement.neh.gov/subject/literature", &listing(&["iliad"]))
            .page(
                "http://edsitement.neh.gov/lesson-plan/iliad",
                &lesson("The Iliad", "Used under license. All Rights Reserved."),
            );

        let mut pipeline = pipeline(source, work.path(), out.path());
        pipeline.run(&[WalkMode::Lessons]).await;

        let catalog = pipeline.into_catalog();
        let labels: Vec<&str> = catalog.entries().iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec![UNIT_LABEL, RESOURCES_LABEL, "worksheet"]);
    }

    #[tokio::test]
    async fn test_off_site_lesson_pdf_is_published() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let page = r#"<html><body>
                <div id="description"><h1>Primary Sources</h1></div>
                <div id="sect-resources"><a href="http://www.loc.gov/docs/primary.pdf">Primary</a></div>
            </body></html>"#;
        let source = lesson_site()
            .page("http://edsitement.neh.gov/subject/literature", &listing(&["sources"]))
            .page("http://edsitement.neh.gov/lesson-plan/sources", page);

        let mut pipeline = pipeline(source, work.path(), out.path());
        let summary = pipeline.run(&[WalkMode::Lessons]).await;
        assert_eq!(summary, RunSummary { published: 1, skipped: 0, failed: 0 });

        let catalog = pipeline.into_catalog();
        let entries = catalog.entries();
        let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec![UNIT_LABEL, RESOURCES_LABEL, "primary"]);
        assert_eq!(entries[2].kind, ContentKind::Document);
        assert_eq!(entries[2].source.as_deref(), Some("http://www.loc.gov/docs/primary.pdf"));
        assert_eq!(entries[2].metadata.source_id, "http://www.loc.gov/docs/primary.pdf");
    }

    #[tokio::test]
    async fn test_failing_leaf_does_not_stop_walk() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let source = lesson_site()
            .page("http://edsitement.neh.gov/subject/literature", &listing(&["broken", "odyssey"]))
            .failing("http://edsitement.neh.gov/lesson-plan/broken", 500)
            .page("http://edsitement.neh.gov/lesson-plan/odyssey", &lesson("The Odyssey", ""));

        let mut pipeline = pipeline(source, work.path(), out.path());
        let summary = pipeline.run(&[WalkMode::Lessons]).await;
        assert_eq!(summary, RunSummary { published: 1, skipped: 1, failed: 0 });

        let (enters, leaves) = pipeline.assembler().cursor().counts();
        assert_eq!(enters, leaves);

        let catalog = pipeline.into_catalog();
        assert_eq!(catalog.entries()[0].path, format!("EDSITEment/{LESSON_ROOT}/Literature/The Odyssey"));
    }

    #[tokio::test]
    async fn test_student_resources() {
        let site = Url::parse(SITE).unwrap();
        let resource_listing = r#"
            <h3><a href="/student-resource/revolution-atlas">Atlas</a></h3>
            <h3><a href="/student-resource/flash-game">Game</a></h3>
            <h3><a href="/student-resource/maps">Maps</a></h3>
        "#;
        let card = |title: &str, more: &str| {
            format!(
                r#"<div id="description"><h2>{title}</h2><div class="created">2010</div><p>About {title}.</p></div>
                   <div class="image"><img src="/sites/default/files/{title}.jpg"></div>
                   <div class="caption"><div>Document</div><div>Library of Congress</div></div>
                   <div class="more"><a href="{more}">View more</a></div>"#
            )
        };
        let mirrored = r#"<div id="content"><p>Old <a href="/files/old.pdf">maps</a>.</p><img src="/x.jpg"></div>"#;

        let source = MemorySource::new()
            .page(&resource_listing_url(&site, 25), resource_listing)
            .page(
                "http://edsitement.neh.gov/student-resource/revolution-atlas",
                &card("atlas", "/sites/default/files/atlas.pdf"),
            )
            .binary("http://edsitement.neh.gov/sites/default/files/atlas.jpg", b"img")
            .page("http://edsitement.neh.gov/student-resource/flash-game", &card("game", "http://example.org/game.swf"))
            .page("http://edsitement.neh.gov/student-resource/maps", &card("maps", "/websites/maps"))
            .page("http://edsitement.neh.gov/websites/maps", mirrored);

        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let mut pipeline = pipeline(source, work.path(), out.path());
        let summary = pipeline.run(&[WalkMode::Resources]).await;
        assert_eq!(summary, RunSummary { published: 2, skipped: 1, failed: 0 });

        let catalog = pipeline.into_catalog();
        let entries = catalog.entries();

        assert_eq!(entries[0].path, format!("EDSITEment/{RESOURCE_ROOT}/atlas"));
        assert_eq!(entries[0].metadata.source_id, "http://edsitement.neh.gov/sites/default/files/atlas.pdf");
        assert_eq!(entries[0].metadata.description, "About atlas.");
        assert_eq!(
            entries[0].metadata.thumbnail.as_deref(),
            Some("http://edsitement.neh.gov/sites/default/files/atlas.jpg")
        );
        assert_eq!(entries[2].label, "atlas");
        assert_eq!(entries[2].source.as_deref(), Some("http://edsitement.neh.gov/sites/default/files/atlas.pdf"));

        let atlas = zip_entries(&out.path().join(entries[0].source.as_deref().unwrap()));
        assert!(atlas[0].1.contains("<img alt='atlas.jpg' src='files/atlas.jpg'>"));
        assert_eq!(atlas[1], ("files/atlas.jpg".to_string(), "img".to_string()));

        assert_eq!(entries[3].path, format!("EDSITEment/{RESOURCE_ROOT}/maps"));
        assert_eq!(entries[3].metadata.source_id, "http://edsitement.neh.gov/websites/maps");
        assert_eq!(entries[5].metadata.source_id, "http://edsitement.neh.gov/files/old.pdf");
        let maps = zip_entries(&out.path().join(entries[3].source.as_deref().unwrap()));
        assert!(maps[0].1.contains(r#"<div id="content"><p>Old maps.</p></div>"#));
    }

    #[tokio::test]
    async fn test_student_resource_without_image_bytes() {
        let site = Url::parse(SITE).unwrap();
        let card = r#"<div id="description"><h2>Atlas</h2><p>About atlas.</p></div>
                      <div class="image"><img src="/sites/default/files/missing.jpg"></div>
                      <div class="more"><a href="/sites/default/files/atlas.pdf">View more</a></div>"#;
        let source = MemorySource::new()
            .page(&resource_listing_url(&site, 25), r#"<h3><a href="/student-resource/atlas">Atlas</a></h3>"#)
            .page("http://edsitement.neh.gov/student-resource/atlas", card);

        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let mut pipeline = pipeline(source, work.path(), out.path());
        let summary = pipeline.run(&[WalkMode::Resources]).await;
        assert_eq!(summary, RunSummary { published: 1, skipped: 0, failed: 0 });

        let catalog = pipeline.into_catalog();
        let unit = zip_entries(&out.path().join(catalog.entries()[0].source.as_deref().unwrap()));
        assert_eq!(unit.len(), 1);
        assert!(unit[0].1.contains("About atlas."));
        assert!(!unit[0].1.contains("<img"));
    }

    #[test]
    fn test_url_title() {
        assert_eq!(url_title(&Url::parse("http://edsitement.neh.gov/lesson-plan/iliad/").unwrap()), "iliad");
        assert_eq!(url_title(&Url::parse("http://edsitement.neh.gov/").unwrap()), "http://edsitement.neh.gov/");
    }

    #[test]
    fn test_summary_add() {
        let mut total = RunSummary { published: 1, skipped: 2, failed: 0 };
        total += RunSummary { published: 3, skipped: 0, failed: 1 };
        assert_eq!(total, RunSummary { published: 4, skipped: 2, failed: 1 });
    }
}
