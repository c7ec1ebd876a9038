//! Hierarchy paths locating a unit inside the destination catalog.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered, non-empty sequence of labels.
///
/// Values are immutable: descending produces a new path, so a path can be
/// handed down the call chain without any enter/leave bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HierarchyPath(Vec<String>);

impl HierarchyPath {
    pub fn root(label: impl Into<String>) -> Self {
        Self(vec![label.into()])
    }

    /// Build a path from labels; `None` when `labels` is empty.
    pub fn from_labels<I, S>(labels: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() { None } else { Some(Self(labels)) }
    }

    /// New path one level deeper.
    pub fn child(&self, label: impl Into<String>) -> Self {
        let mut labels = self.0.clone();
        labels.push(label.into());
        Self(labels)
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    /// Display title of the unit this path locates.
    pub fn leaf(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Filesystem-safe slug of all labels, used to name staged packages.
    pub fn slug(&self) -> String {
        let mut slug = String::new();
        for c in self.0.join("-").chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.ends_with('-') {
                slug.push('-');
            }
        }
        slug.trim_matches('-').to_string()
    }
}

impl fmt::Display for HierarchyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}
