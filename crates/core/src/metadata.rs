//! Metadata record attached to every published artifact.

use serde::{Deserialize, Serialize};

use crate::AppConfig;

/// Per-run values shared by every metadata record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataDefaults {
    pub language: String,
    pub license: String,
    pub copyright_holder: String,
}

impl MetadataDefaults {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            language: config.channel_language.clone(),
            license: config.license.clone(),
            copyright_holder: config.copyright_holder.clone(),
        }
    }

    /// Record for an artifact that originated at `source_id`.
    pub fn record(&self, source_id: &str, description: &str) -> Metadata {
        Metadata {
            description: description.to_string(),
            language: self.language.clone(),
            license: self.license.clone(),
            copyright_holder: self.copyright_holder.clone(),
            author: String::new(),
            source_id: source_id.to_string(),
            thumbnail: None,
        }
    }
}

impl Default for MetadataDefaults {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Catalog metadata. `source_id` always points back at the page or resource
/// URL the artifact was produced from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub description: String,
    pub language: String,
    pub license: String,
    pub copyright_holder: String,
    pub author: String,
    pub source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl Metadata {
    /// Copy of this record re-pointed at another origin.
    pub fn with_source(&self, source_id: &str) -> Self {
        Self { source_id: source_id.to_string(), ..self.clone() }
    }
}
