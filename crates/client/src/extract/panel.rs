//! Resource panel of a lesson page: hero image, PDFs, student resource links.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::delink::{DelinkOptions, delink_outer};
use crate::fetch::{file_name, file_stem, resolve};

/// Hero image of the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeroImage {
    pub url: String,
    /// De-linked caption paragraphs.
    pub credits_html: String,
    /// Caption carries a restrictive copyright notice.
    pub has_copyright: bool,
}

/// A PDF linked from the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfLink {
    /// Final path segment of the URL, extension included.
    pub name: String,
    pub url: String,
}

impl PdfLink {
    /// Name shown in the catalog: the file name without its extension.
    pub fn display_name(&self) -> String {
        file_stem(&self.url)
    }
}

/// Everything the panel offers. Empty when the panel is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourcePanel {
    pub hero_image: Option<HeroImage>,
    pub pdf_links: Vec<PdfLink>,
    /// Informational only; never materialized.
    pub external_links: Vec<String>,
}

impl ResourcePanel {
    pub fn parse(document: &Html, page_url: &Url) -> Self {
        let body_sel = Selector::parse("div#sect-resources").expect("invalid selector");
        let Some(body) = document.select(&body_sel).next() else {
            tracing::debug!(url = %page_url, "resource panel absent");
            return Self::default();
        };

        Self {
            hero_image: hero_image(body, page_url),
            pdf_links: pdf_links(body, page_url),
            external_links: external_links(body, page_url),
        }
    }

    /// Hero image, unless its caption carries a copyright notice.
    pub fn publishable_image(&self) -> Option<&HeroImage> {
        self.hero_image.as_ref().filter(|img| !img.has_copyright)
    }
}

fn hero_image(body: ElementRef<'_>, page_url: &Url) -> Option<HeroImage> {
    let item_sel = Selector::parse("li.lesson-image").expect("invalid selector");
    let img_sel = Selector::parse("img[src]").expect("invalid selector");
    let p_sel = Selector::parse("p").expect("invalid selector");

    let item = body.select(&item_sel).next()?;
    let src = item.select(&img_sel).next()?.value().attr("src")?;

    let credits_html = item
        .select(&p_sel)
        .map(|p| delink_outer(p, DelinkOptions::default()).html)
        .collect::<String>();

    Some(HeroImage { url: resolve(page_url, src), credits_html, has_copyright: has_copyright(item) })
}

fn pdf_links(body: ElementRef<'_>, page_url: &Url) -> Vec<PdfLink> {
    let a_sel = Selector::parse("a[href]").expect("invalid selector");
    body.select(&a_sel)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.trim().to_ascii_lowercase().ends_with(".pdf"))
        .map(|href| {
            let url = resolve(page_url, href);
            PdfLink { name: file_name(&url), url }
        })
        .collect()
}

fn external_links(body: ElementRef<'_>, page_url: &Url) -> Vec<String> {
    let a_sel = Selector::parse("dd#student-resources a[href]").expect("invalid selector");
    body.select(&a_sel)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| resolve(page_url, href))
        .collect()
}

/// Whether a text mentions a licence together with a copyright glyph or
/// "all rights reserved" (case-insensitive).
pub fn text_has_copyright(text: &str) -> bool {
    let text = text.to_lowercase();
    text.contains("license") && (text.contains('©') || text.contains("all rights reserved"))
}

/// Whether any text node under `el` carries a restrictive copyright notice.
pub fn has_copyright(el: ElementRef<'_>) -> bool {
    el.text().any(text_has_copyright)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("http://edsitement.neh.gov/lesson-plan/iliad").unwrap()
    }

    const PANEL: &str = r#"
        <div id="sect-resources">
            <ul>
                <li class="lesson-image">
                    <img src="/sites/default/files/achilles.jpg">
                    <p>Achilles, <a href="http://commons.wikimedia.org">Wikimedia</a> public domain.</p>
                </li>
            </ul>
            <a href="/sites/default/files/worksheet.pdf">Worksheet</a>
            <a href="http://other.org/Map.PDF">Map</a>
            <a href="/lesson-plan/odyssey">Related</a>
            <dl><dd id="student-resources"><a href="http://www.perseus.tufts.edu/">Perseus</a></dd></dl>
        </div>
    "#;

    #[test]
    fn test_parse_full_panel() {
        let doc = Html::parse_document(PANEL);
        let panel = ResourcePanel::parse(&doc, &page_url());

        let hero = panel.hero_image.as_ref().unwrap();
        assert_eq!(hero.url, "http://edsitement.neh.gov/sites/default/files/achilles.jpg");
        assert_eq!(hero.credits_html, "<p>Achilles, Wikimedia public domain.</p>");
        assert!(!hero.has_copyright);
        assert!(panel.publishable_image().is_some());

        assert_eq!(panel.pdf_links.len(), 2);
        assert_eq!(panel.pdf_links[0].name, "worksheet.pdf");
        assert_eq!(panel.pdf_links[0].display_name(), "worksheet");
        assert_eq!(panel.pdf_links[0].url, "http://edsitement.neh.gov/sites/default/files/worksheet.pdf");
        assert_eq!(panel.pdf_links[1].display_name(), "Map");

        assert_eq!(panel.external_links, vec!["http://www.perseus.tufts.edu/"]);
    }

    #[test]
    fn test_missing_panel_is_empty() {
        let doc = Html::parse_document("<div id='sect-introduction'></div>");
        let panel = ResourcePanel::parse(&doc, &page_url());
        assert_eq!(panel, ResourcePanel::default());
        assert!(panel.publishable_image().is_none());
    }

    #[test]
    fn test_copyrighted_image_is_not_publishable() {
        let doc = Html::parse_document(
            r#"<div id="sect-resources"><li class="lesson-image"><img src="/a.jpg">
               <p>Used under License. © 2009 Getty Images</p></li></div>"#,
        );
        let panel = ResourcePanel::parse(&doc, &page_url());
        assert!(panel.hero_image.as_ref().unwrap().has_copyright);
        assert!(panel.publishable_image().is_none());
    }

    #[test]
    fn test_copyright_detection_rules() {
        assert!(text_has_copyright("LICENSE: All Rights Reserved"));
        assert!(text_has_copyright("licensed image ©"));
        assert!(!text_has_copyright("© 2009 Getty Images"));
        assert!(!text_has_copyright("Creative Commons license"));
    }
}
