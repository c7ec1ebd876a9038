//! Lesson page decomposition: title, sections, menu and resource panel.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use super::menu::{Menu, THE_BASICS};
use super::panel::ResourcePanel;
use super::sections::{Section, SectionId, extract_sections};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("invalid regex"));

/// Collapse every whitespace run to one space and trim.
pub fn clean_title(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Everything extracted from one lesson page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonPage {
    pub title: Option<String>,
    pub sections: Vec<Section>,
    pub menu: Menu,
    pub panel: ResourcePanel,
}

impl LessonPage {
    pub fn parse(html: &str, page_url: &Url) -> Self {
        let document = Html::parse_document(html);

        let title_sel = Selector::parse("div#description").expect("invalid selector");
        let title = document
            .select(&title_sel)
            .next()
            .map(|d| clean_title(&d.text().collect::<String>()))
            .filter(|t| !t.is_empty());

        let sections = extract_sections(&document);
        let menu = build_menu(&document, &sections);
        let panel = ResourcePanel::parse(&document, page_url);

        Self { title, sections, menu, panel }
    }

    /// Sections that have a menu entry, paired with their part file name.
    pub fn parts(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.sections
            .iter()
            .filter_map(|s| self.menu.get(s.id.key()).map(|entry| (entry.filename.as_str(), s)))
    }
}

/// Menu from the lesson tab headings, restricted to sections present on the
/// page, followed by the always-present "The Basics" entry.
fn build_menu(document: &Html, sections: &[Section]) -> Menu {
    let heading_sel = Selector::parse("div#sect-thelesson h4").expect("invalid selector");
    let present: HashSet<SectionId> = sections.iter().map(|s| s.id).collect();

    let mut menu = Menu::new();
    for heading in document.select(&heading_sel) {
        let title = clean_title(&heading.text().collect::<String>());
        match SectionId::from_key(&Menu::key_for(&title)) {
            Some(SectionId::TheBasics) => {}
            Some(id) if present.contains(&id) => menu.add(&title),
            _ => tracing::debug!(title = %title, "menu heading without extracted section"),
        }
    }
    menu.add(THE_BASICS);
    menu
}
