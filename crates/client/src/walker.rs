//! Hierarchy walker: lazily yields leaf pages with their catalog paths.
//!
//! Lesson mode: landing page -> subject listing -> lesson links, path
//! `[LESSON_ROOT, subject title]`. Resource mode: one filtered listing per
//! subject -> student resource links, path `[RESOURCE_ROOT]`.
//!
//! Subjects are visited in declaration order and links in document order. A
//! listing that fails to load skips its subject only.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use scraper::{Html, Selector};
use url::Url;

use edsite_core::{AppConfig, Error, HierarchyPath};

use crate::fetch::{PageSource, canonicalize, resolve};

pub const LESSON_ROOT: &str = "Lesson Plans or For Teachers";
pub const RESOURCE_ROOT: &str = "Student Resources";

/// Link pattern that marks a student resource on a listing.
const RESOURCE_PATTERN: &str = "/student-resource/";

/// Traversal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode {
    Lessons,
    Resources,
}

/// Throttles; `None` is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    pub subjects: Option<usize>,
    pub items_per_subject: Option<usize>,
}

/// Walker settings shared by both modes.
#[derive(Debug, Clone)]
pub struct WalkConfig {
    pub site: Url,
    pub subject_ids: Vec<u32>,
    pub lesson_bounds: Bounds,
    pub resource_bounds: Bounds,
    /// Sleep before each yielded leaf.
    pub delay: Duration,
}

impl WalkConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        Ok(Self {
            site: canonicalize(&config.base_url).map_err(|e| Error::InvalidUrl(e.to_string()))?,
            subject_ids: config.subject_ids.clone(),
            lesson_bounds: Bounds {
                subjects: config.lesson_subject_limit,
                items_per_subject: config.lesson_item_limit,
            },
            resource_bounds: Bounds {
                subjects: config.resource_subject_limit,
                items_per_subject: config.resource_item_limit,
            },
            delay: config.request_delay(),
        })
    }

    fn bounds(&self, mode: WalkMode) -> Bounds {
        match mode {
            WalkMode::Lessons => self.lesson_bounds,
            WalkMode::Resources => self.resource_bounds,
        }
    }
}

/// A leaf page to process and where its unit belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafPage {
    pub url: String,
    pub path: HierarchyPath,
}

/// Lazy, finite sequence of leaf pages for one mode.
pub struct Walker {
    source: Arc<dyn PageSource>,
    config: WalkConfig,
    mode: WalkMode,
    started: bool,
    subjects: VecDeque<u32>,
    subject_pages: HashMap<u32, String>,
    pending: VecDeque<LeafPage>,
}

impl Walker {
    pub fn new(source: Arc<dyn PageSource>, config: WalkConfig, mode: WalkMode) -> Self {
        Self {
            source,
            config,
            mode,
            started: false,
            subjects: VecDeque::new(),
            subject_pages: HashMap::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn mode(&self) -> WalkMode {
        self.mode
    }

    /// Forget all progress; the next call to `next_leaf` starts over.
    pub fn restart(&mut self) {
        self.started = false;
        self.subjects.clear();
        self.subject_pages.clear();
        self.pending.clear();
    }

    pub async fn next_leaf(&mut self) -> Option<LeafPage> {
        if !self.started {
            self.start().await;
        }
        loop {
            if let Some(leaf) = self.pending.pop_front() {
                if !self.config.delay.is_zero() {
                    tokio::time::sleep(self.config.delay).await;
                }
                return Some(leaf);
            }
            let subject = self.subjects.pop_front()?;
            self.load_subject(subject).await;
        }
    }

    async fn start(&mut self) {
        self.started = true;
        let limit = self.config.bounds(self.mode).subjects.unwrap_or(usize::MAX);
        self.subjects = self.config.subject_ids.iter().copied().take(limit).collect();

        if self.mode == WalkMode::Lessons {
            let landing = resolve(&self.config.site, "/lesson-plans");
            match self.source.fetch_text(&landing).await {
                Ok(html) => {
                    self.subject_pages = parse_subject_index(&html, &self.config.site, &self.config.subject_ids);
                }
                Err(e) => {
                    tracing::error!(url = %landing, error = %e, "lesson landing page failed; no subjects walked");
                    self.subjects.clear();
                }
            }
        }
    }

    async fn load_subject(&mut self, subject: u32) {
        let limit = self.config.bounds(self.mode).items_per_subject.unwrap_or(usize::MAX);

        let (listing, path) = match self.mode {
            WalkMode::Lessons => {
                let Some(listing) = self.subject_pages.get(&subject).cloned() else {
                    tracing::warn!(subject, "subject missing from lesson landing page");
                    return;
                };
                (listing, None)
            }
            WalkMode::Resources => (
                resource_listing_url(&self.config.site, subject),
                Some(HierarchyPath::root(RESOURCE_ROOT)),
            ),
        };

        let html = match self.source.fetch_text(&listing).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(subject, url = %listing, error = %e, "listing failed; skipping subject");
                return;
            }
        };
        let Ok(listing_url) = Url::parse(&listing) else {
            return;
        };

        let (path, links) = match path {
            Some(path) => (path, parse_resource_listing(&html, &listing_url)),
            None => {
                let (title, links) = parse_lesson_listing(&html, &listing_url);
                let title = title.unwrap_or_else(|| format!("Subject {subject}"));
                (HierarchyPath::root(LESSON_ROOT).child(title), links)
            }
        };

        tracing::info!(subject, path = %path, links = links.len(), "subject listing loaded");
        self.pending
            .extend(links.into_iter().take(limit).map(|url| LeafPage { url, path: path.clone() }));
    }
}

/// Listing URL of one subject's student resources.
pub fn resource_listing_url(site: &Url, subject: u32) -> String {
    resolve(site, &format!("/student-resources/all?grade=All&subject={subject}&type=All"))
}

/// Subject page URLs announced on the lesson landing page, by subject id.
pub fn parse_subject_index(html: &str, base: &Url, subject_ids: &[u32]) -> HashMap<u32, String> {
    let document = Html::parse_document(html);
    let mut pages = HashMap::new();
    for &id in subject_ids {
        let Ok(selector) = Selector::parse(&format!("h3#node-{id} a[href]")) else {
            continue;
        };
        if let Some(href) = document.select(&selector).next().and_then(|a| a.value().attr("href")) {
            pages.insert(id, resolve(base, href));
        }
    }
    pages
}

/// Subject title and lesson links of a subject listing.
pub fn parse_lesson_listing(html: &str, base: &Url) -> (Option<String>, Vec<String>) {
    let document = Html::parse_document(html);
    let title_sel = Selector::parse("h2.subject-area").expect("invalid selector");
    let link_sel = Selector::parse("div.lesson-plan-link a[href]").expect("invalid selector");

    let title = document
        .select(&title_sel)
        .next()
        .map(|h| crate::extract::clean_title(&h.text().collect::<String>()))
        .filter(|t| !t.is_empty());

    let links = document
        .select(&link_sel)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| resolve(base, href))
        .collect();

    (title, links)
}

/// Student resource links of a resource listing, in document order.
pub fn parse_resource_listing(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let link_sel = Selector::parse("h3 a[href]").expect("invalid selector");
    document
        .select(&link_sel)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.contains(RESOURCE_PATTERN))
        .map(|href| resolve(base, href))
        .collect()
}
