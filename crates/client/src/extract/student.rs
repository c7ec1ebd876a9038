//! Student resource pages: a summary card pointing at one "view more" resource.

use html_escape::encode_text;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::delink::{DelinkOptions, delink_outer};
use super::lesson::clean_title;
use crate::fetch::resolve;

/// Decomposed student resource page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentResourcePage {
    /// Plain-text title from the description heading.
    pub title: Option<String>,
    /// Heading, creation line and de-linked description paragraph.
    pub summary_html: String,
    /// Plain text of the description paragraph.
    pub description: String,
    pub image_url: Option<String>,
    pub credits_html: String,
    /// The resource this page is about.
    pub view_more: Option<String>,
}

impl StudentResourcePage {
    pub fn parse(html: &str, page_url: &Url) -> Self {
        let document = Html::parse_document(html);

        let description_sel = Selector::parse("div#description").expect("invalid selector");
        let h2_sel = Selector::parse("h2").expect("invalid selector");
        let created_sel = Selector::parse("div.created").expect("invalid selector");
        let p_sel = Selector::parse("p").expect("invalid selector");
        let image_sel = Selector::parse("div.image img[src]").expect("invalid selector");
        let caption_sel = Selector::parse("div.caption").expect("invalid selector");
        let more_sel = Selector::parse("div.more a[href]").expect("invalid selector");

        let mut page = Self::default();

        if let Some(content) = document.select(&description_sel).next() {
            let heading = content.select(&h2_sel).next();
            page.title = heading.map(|h| clean_title(&h.text().collect::<String>())).filter(|t| !t.is_empty());

            if let Some(h) = heading {
                page.summary_html.push_str(&h.html());
            }
            if let Some(created) = content.select(&created_sel).next() {
                page.summary_html.push_str(&created.html());
            }
            if let Some(p) = content.select(&p_sel).next() {
                page.summary_html.push_str(&delink_outer(p, DelinkOptions::default()).html);
                page.description = clean_title(&p.text().collect::<String>());
            }
        }

        page.image_url = document
            .select(&image_sel)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(|src| resolve(page_url, src));

        if let Some(caption) = document.select(&caption_sel).next() {
            let mut parts = caption
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|el| el.value().name() == "div");
            if let Some(kind) = parts.next() {
                tracing::debug!(kind = %clean_title(&kind.text().collect::<String>()), "student resource type");
                page.credits_html.push_str(&format!("<div>{}</div>", kind.html()));
            }
            if let Some(source) = parts.next() {
                let text = source.text().collect::<String>();
                page.credits_html.push_str(&format!("<div>{}</div>", encode_text(&text)));
            }
        }

        page.view_more = document
            .select(&more_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| resolve(page_url, href));

        page
    }

    /// File name of the page image inside the package, if any.
    pub fn image_file_name(&self) -> Option<String> {
        self.image_url.as_deref().map(crate::fetch::file_name).filter(|n| !n.is_empty())
    }

    /// Index document: summary, image and credits.
    pub fn index_document(&self) -> String {
        let img_tag = match self.image_file_name() {
            Some(name) => format!("<img alt='{name}' src='files/{name}'>", name = encode_text(&name)),
            None => String::new(),
        };
        format!(
            "<html><head><meta charset=\"UTF-8\"></head><body>{}{}{}</body></html>",
            self.summary_html, img_tag, self.credits_html
        )
    }
}
