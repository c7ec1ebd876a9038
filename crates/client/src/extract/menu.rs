//! Lesson menu: the index document linking every section part file.

use html_escape::{encode_double_quoted_attribute, encode_text};

/// One menu line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    /// Part file name under `files/`.
    pub filename: String,
    /// Display title.
    pub text: String,
}

/// Insertion-ordered mapping of normalized key -> entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Menu {
    entries: Vec<(String, MenuEntry)>,
}

/// Title of the entry appended to every menu.
pub const THE_BASICS: &str = "The Basics";

impl Menu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalized key: lower-cased, spaces replaced by underscores.
    pub fn key_for(title: &str) -> String {
        title.trim().to_lowercase().replace(' ', "_")
    }

    /// Add a title. Re-adding an existing key updates it in place.
    pub fn add(&mut self, title: &str) {
        let key = Self::key_for(title);
        let entry = MenuEntry { filename: format!("{key}.html"), text: title.trim().to_string() };
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = entry,
            None => self.entries.push((key, entry)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&MenuEntry> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, e)| e)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `<li>` items pointing into `files/`.
    pub fn to_html(&self) -> String {
        self.entries
            .iter()
            .map(|(_, e)| {
                format!(
                    "<li><a href=\"files/{}\">{}</a></li>",
                    encode_double_quoted_attribute(&e.filename),
                    encode_text(&e.text)
                )
            })
            .collect()
    }

    /// Complete index document for the lesson package.
    pub fn index_document(&self) -> String {
        format!(
            "<html><head><meta charset=\"UTF-8\"></head><body><ul>{}</ul></body></html>",
            self.to_html()
        )
    }
}
