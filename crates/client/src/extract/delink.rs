//! Markup serialization with hyperlinks replaced by their content.
//!
//! Anchors are unwrapped in place: their children are kept, the `<a>` tag is
//! dropped. Hrefs and (optionally stripped) image sources are collected on the
//! way so mirrored pages can report what they pointed at.

use scraper::{ElementRef, Html, Node};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Serialization switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelinkOptions {
    /// Drop `<img>` tags entirely, recording their `src`.
    pub strip_images: bool,
}

/// De-linked markup plus what was removed from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delinked {
    pub html: String,
    /// Raw `href` values of every unwrapped anchor, in document order.
    pub hrefs: Vec<String>,
    /// Raw `src` values of stripped images, in document order.
    pub images: Vec<String>,
}

/// De-link a markup fragment.
///
/// Idempotent: the output contains no anchors, so a second pass only
/// re-serializes the same tree.
pub fn delink_fragment(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    delink_inner(fragment.root_element(), DelinkOptions::default()).html
}

/// Serialize the children of `el` without anchors.
pub fn delink_inner(el: ElementRef<'_>, options: DelinkOptions) -> Delinked {
    let mut out = Delinked::default();
    write_children(el, options, &mut out);
    out
}

/// Serialize `el` itself (its own tag included) without anchors.
pub fn delink_outer(el: ElementRef<'_>, options: DelinkOptions) -> Delinked {
    let mut out = Delinked::default();
    write_element(el, options, &mut out);
    out
}

fn write_children(el: ElementRef<'_>, options: DelinkOptions, out: &mut Delinked) {
    let raw = RAW_TEXT_ELEMENTS.contains(&el.value().name());
    for child in el.children() {
        match child.value() {
            Node::Text(text) => {
                if raw {
                    out.html.push_str(text);
                } else {
                    out.html.push_str(&html_escape::encode_text(&**text));
                }
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    write_element(child_el, options, out);
                }
            }
            _ => {}
        }
    }
}

fn write_element(el: ElementRef<'_>, options: DelinkOptions, out: &mut Delinked) {
    let element = el.value();
    let name = element.name();

    if name == "a" {
        if let Some(href) = element.attr("href") {
            out.hrefs.push(href.to_string());
        }
        write_children(el, options, out);
        return;
    }

    if name == "img" && options.strip_images {
        if let Some(src) = element.attr("src") {
            out.images.push(src.to_string());
        }
        return;
    }

    out.html.push('<');
    out.html.push_str(name);
    for (attr, value) in element.attrs() {
        out.html.push(' ');
        out.html.push_str(attr);
        out.html.push_str("=\"");
        out.html.push_str(&html_escape::encode_double_quoted_attribute(value));
        out.html.push('"');
    }
    out.html.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }

    write_children(el, options, out);

    out.html.push_str("</");
    out.html.push_str(name);
    out.html.push('>');
}
