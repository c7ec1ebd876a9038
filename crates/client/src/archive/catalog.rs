//! Catalog collaborator: the only channel through which units leave the harvester.

use std::path::{Path, PathBuf};

use serde::Serialize;

use edsite_core::{AppConfig, Error, Metadata};

use crate::fetch::file_extension;

/// Where a catalog entry's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// Referenced directly; never staged locally.
    Url(String),
    /// A file staged in the work directory.
    Local(PathBuf),
}

impl SourceRef {
    pub fn is_local(&self) -> bool {
        matches!(self, SourceRef::Local(_))
    }

    fn extension(&self) -> Option<String> {
        match self {
            SourceRef::Url(url) => file_extension(url),
            SourceRef::Local(path) => path.extension().map(|e| e.to_string_lossy().to_lowercase()),
        }
    }
}

/// Kind of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Topic,
    Html5,
    Document,
    Video,
    Audio,
    Image,
}

impl ContentKind {
    /// Kind implied by a source's file extension; archives are `Html5`.
    pub fn infer(source: &SourceRef) -> Option<Self> {
        match source.extension()?.as_str() {
            "zip" => Some(ContentKind::Html5),
            "pdf" => Some(ContentKind::Document),
            "mp4" | "webm" => Some(ContentKind::Video),
            "mp3" | "m4a" => Some(ContentKind::Audio),
            "jpg" | "jpeg" | "png" | "gif" => Some(ContentKind::Image),
            _ => None,
        }
    }
}

/// Receiver of published units and folders.
///
/// `path` is the rendered hierarchy (labels joined with `/`) the entry lives under.
pub trait Catalog {
    fn add_file(
        &mut self, path: &str, label: &str, source: &SourceRef, kind: ContentKind, metadata: &Metadata,
    ) -> Result<(), Error>;

    fn add_folder(&mut self, path: &str, label: &str, metadata: &Metadata) -> Result<(), Error>;
}

/// Channel header written at the top of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelInfo {
    pub name: String,
    pub source_id: String,
    pub domain: String,
    pub language: String,
}

impl ChannelInfo {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            name: config.channel_name.clone(),
            source_id: config.channel_source_id.clone(),
            domain: config.channel_domain.clone(),
            language: config.channel_language.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub path: String,
    pub label: String,
    pub kind: ContentKind,
    /// URL or path relative to the output directory. Folders have none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub metadata: Metadata,
}

#[derive(Serialize)]
struct Manifest<'a> {
    channel: &'a ChannelInfo,
    generated_at: String,
    entries: &'a [CatalogEntry],
}

/// Catalog written to an output directory as `catalog.json` plus copied files.
#[derive(Debug)]
pub struct ManifestCatalog {
    root: PathBuf,
    channel: ChannelInfo,
    entries: Vec<CatalogEntry>,
}

pub const MANIFEST_FILE: &str = "catalog.json";

impl ManifestCatalog {
    /// Open (creating if needed) the output directory.
    pub fn open(root: impl Into<PathBuf>, channel: ChannelInfo) -> Result<Self, Error> {
        let root = root.into();
        std::fs::create_dir_all(root.join("files"))
            .map_err(|e| Error::Catalog(format!("cannot open output directory {}: {}", root.display(), e)))?;
        Ok(Self { root, channel, entries: Vec::new() })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Copy a staged file under `files/`, returning its path relative to the root.
    fn store_local(&self, path: &Path) -> Result<String, Error> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Catalog(format!("source {} has no file name", path.display())))?;
        let relative = format!("files/{:05}-{}", self.entries.len(), name);
        std::fs::copy(path, self.root.join(&relative))
            .map_err(|e| Error::Catalog(format!("cannot copy {}: {}", path.display(), e)))?;
        Ok(relative)
    }

    /// Write the manifest and return its path.
    pub fn finish(self) -> Result<PathBuf, Error> {
        let manifest = Manifest {
            channel: &self.channel,
            generated_at: chrono::Utc::now().to_rfc3339(),
            entries: &self.entries,
        };
        let json = serde_json::to_string_pretty(&manifest).map_err(|e| Error::Catalog(e.to_string()))?;
        let path = self.root.join(MANIFEST_FILE);
        std::fs::write(&path, json)?;
        tracing::info!(entries = self.entries.len(), path = %path.display(), "catalog written");
        Ok(path)
    }
}

impl Catalog for ManifestCatalog {
    fn add_file(
        &mut self, path: &str, label: &str, source: &SourceRef, kind: ContentKind, metadata: &Metadata,
    ) -> Result<(), Error> {
        if kind == ContentKind::Topic {
            return Err(Error::Catalog(format!("{label:?} is a folder kind, not a file")));
        }
        let stored = match source {
            SourceRef::Url(url) => url.clone(),
            SourceRef::Local(local) => self.store_local(local)?,
        };
        tracing::debug!(path, label, ?kind, "catalog file");
        self.entries.push(CatalogEntry {
            path: path.to_string(),
            label: label.to_string(),
            kind,
            source: Some(stored),
            metadata: metadata.clone(),
        });
        Ok(())
    }

    fn add_folder(&mut self, path: &str, label: &str, metadata: &Metadata) -> Result<(), Error> {
        tracing::debug!(path, label, "catalog folder");
        self.entries.push(CatalogEntry {
            path: path.to_string(),
            label: label.to_string(),
            kind: ContentKind::Topic,
            source: None,
            metadata: metadata.clone(),
        });
        Ok(())
    }
}
