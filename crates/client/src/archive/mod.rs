//! Archive assembly: staging packages, attaching binaries, publishing units.
//!
//! A unit's package is buffered in memory and written as a zip (`index.html`
//! plus `files/...`) exactly once, in [`ArchiveUnit::finalize`]. Publishing
//! renders the unit's [`HierarchyPath`] onto the catalog cursor inside a
//! scope guard, so the cursor returns to its prior depth on every exit path.

pub mod catalog;
pub mod cursor;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use catalog::{Catalog, CatalogEntry, ChannelInfo, ContentKind, MANIFEST_FILE, ManifestCatalog, SourceRef};
pub use cursor::{CursorScope, PathCursor};

use edsite_core::{Error, HierarchyPath, Metadata};

use crate::fetch::{PageSource, file_stem};

/// Catalog label of every published unit package.
pub const UNIT_LABEL: &str = "THE LESSON";

/// Catalog folder holding a unit's materialized resources.
pub const RESOURCES_LABEL: &str = "RESOURCES";

/// One materialized artifact waiting to be published next to its unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedFile {
    pub source: SourceRef,
    pub label: String,
    /// Own metadata; `None` falls back to the unit's record.
    pub metadata: Option<Metadata>,
}

impl MaterializedFile {
    /// Direct URL reference labelled with the URL's file stem.
    pub fn url(url: &str, metadata: Option<Metadata>) -> Self {
        Self { source: SourceRef::Url(url.to_string()), label: file_stem(url), metadata }
    }

    /// Staged local file labelled with its file stem.
    pub fn local(path: PathBuf, metadata: Option<Metadata>) -> Self {
        let label = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        Self { source: SourceRef::Local(path), label, metadata }
    }
}

/// A destination package under construction.
#[derive(Debug)]
pub struct ArchiveUnit {
    path: HierarchyPath,
    target: PathBuf,
    index: Option<String>,
    parts: Vec<(String, Vec<u8>)>,
}

impl ArchiveUnit {
    fn new(path: HierarchyPath, target: PathBuf) -> Self {
        Self { path, target, index: None, parts: Vec::new() }
    }

    pub fn path(&self) -> &HierarchyPath {
        &self.path
    }

    /// Replace the index document. Last write wins.
    pub fn write_index(&mut self, html: &str) {
        self.index = Some(html.to_string());
    }

    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    /// Add a markup file under `files/`, replacing one of the same name.
    pub fn append_part(&mut self, name: &str, html: &str) {
        self.put(name, html.as_bytes().to_vec());
    }

    fn put(&mut self, name: &str, bytes: Vec<u8>) {
        match self.parts.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = bytes,
            None => self.parts.push((name.to_string(), bytes)),
        }
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(n, _)| n.as_str())
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.iter().find(|(n, _)| n == name).map(|(_, b)| b.as_slice())
    }

    /// Write the zip package. Consumes the unit so it is finalized once.
    pub fn finalize(self) -> Result<FinishedPackage, Error> {
        let index = self
            .index
            .ok_or_else(|| Error::Archive(format!("package {} has no index document", self.path)))?;

        let file = std::fs::File::create(&self.target)?;
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let zip_err = |e: zip::result::ZipError| Error::Archive(e.to_string());
        writer.start_file("index.html", options).map_err(zip_err)?;
        writer.write_all(index.as_bytes())?;
        for (name, bytes) in &self.parts {
            writer.start_file(format!("files/{name}"), options).map_err(zip_err)?;
            writer.write_all(bytes)?;
        }
        writer.finish().map_err(zip_err)?;

        tracing::debug!(
            path = %self.path,
            file = %self.target.display(),
            parts = self.parts.len(),
            "package finalized"
        );
        Ok(FinishedPackage { path: self.path, file: self.target })
    }
}

/// A package written to the work directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedPackage {
    pub path: HierarchyPath,
    pub file: PathBuf,
}

impl FinishedPackage {
    pub fn exists(&self) -> bool {
        self.file.is_file()
    }
}

/// Stages packages in a work directory and hands them to a catalog.
pub struct Assembler<C: Catalog> {
    work_dir: PathBuf,
    cursor: PathCursor,
    catalog: C,
    source: Arc<dyn PageSource>,
    staged: usize,
}

impl<C: Catalog> Assembler<C> {
    pub fn new(
        work_dir: impl Into<PathBuf>, root_label: &str, catalog: C, source: Arc<dyn PageSource>,
    ) -> Result<Self, Error> {
        let work_dir = work_dir.into();
        std::fs::create_dir_all(&work_dir)?;
        clear_stale_packages(&work_dir)?;
        Ok(Self { work_dir, cursor: PathCursor::new(root_label), catalog, source, staged: 0 })
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn cursor(&self) -> &PathCursor {
        &self.cursor
    }

    /// Pop the cursor back to `depth`.
    pub fn restore_cursor(&mut self, depth: usize) {
        self.cursor.restore(depth);
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn into_catalog(self) -> C {
        self.catalog
    }

    /// Open a new package for `path`.
    pub fn begin_unit(&mut self, path: &HierarchyPath) -> Result<ArchiveUnit, Error> {
        self.staged += 1;
        let slug = path.slug();
        let slug = if slug.is_empty() { "unit".to_string() } else { slug };
        let target = self.work_dir.join(format!("{:05}-{}.zip", self.staged, slug));
        if target.exists() {
            return Err(Error::Archive(format!("package target {} already exists", target.display())));
        }
        Ok(ArchiveUnit::new(path.clone(), target))
    }

    /// Copy a remote or local binary into the unit's `files/` area.
    pub async fn attach_binary(
        &self, unit: &mut ArchiveUnit, source: &SourceRef, dest_name: &str,
    ) -> Result<(), Error> {
        let bytes = match source {
            SourceRef::Url(url) => self.source.fetch(url).await?.bytes.to_vec(),
            SourceRef::Local(path) => tokio::fs::read(path).await?,
        };
        unit.put(dest_name, bytes);
        Ok(())
    }

    /// Finalize `unit` and publish it, with a sibling RESOURCES folder when
    /// `resources` is non-empty. Staged files are removed afterwards.
    pub fn publish(
        &mut self, unit: ArchiveUnit, kind: ContentKind, metadata: &Metadata, resources: &[MaterializedFile],
    ) -> Result<(), Error> {
        let package = match unit.finalize() {
            Ok(package) => package,
            Err(e) => {
                self.discard(resources);
                return Err(e);
            }
        };

        let result = self.register(&package, kind, metadata, resources);

        remove_staged(&package.file);
        self.discard(resources);
        result
    }

    fn register(
        &mut self, package: &FinishedPackage, kind: ContentKind, metadata: &Metadata, resources: &[MaterializedFile],
    ) -> Result<(), Error> {
        let mut scope = self.cursor.scope(package.path.labels());
        let here = scope.render();

        tracing::info!(path = %here, ?kind, "publishing unit");
        self.catalog.add_file(&here, UNIT_LABEL, &SourceRef::Local(package.file.clone()), kind, metadata)?;

        if resources.is_empty() {
            return Ok(());
        }

        self.catalog.add_folder(&here, RESOURCES_LABEL, metadata)?;
        scope.enter(RESOURCES_LABEL);
        let here = scope.render();

        for resource in resources {
            let Some(resource_kind) = ContentKind::infer(&resource.source) else {
                tracing::warn!(path = %here, label = %resource.label, "resource of unsupported file type skipped");
                continue;
            };
            let meta = resource.metadata.as_ref().unwrap_or(metadata);
            if let Err(e) = self.catalog.add_file(&here, &resource.label, &resource.source, resource_kind, meta) {
                tracing::warn!(path = %here, label = %resource.label, error = %e, "resource not published");
            }
        }
        Ok(())
    }

    /// Remove staged local files of resources that will not be published.
    pub fn discard(&self, resources: &[MaterializedFile]) {
        for resource in resources {
            if let SourceRef::Local(path) = &resource.source {
                remove_staged(path);
            }
        }
    }
}

/// Remove `*.zip` packages left in `work_dir` by an interrupted run.
fn clear_stale_packages(work_dir: &Path) -> Result<(), Error> {
    let mut removed = 0usize;
    for entry in std::fs::read_dir(work_dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e.eq_ignore_ascii_case("zip")) {
            remove_staged(&path);
            removed += 1;
        }
    }
    if removed > 0 {
        tracing::info!(work_dir = %work_dir.display(), removed, "stale staged packages removed");
    }
    Ok(())
}

fn remove_staged(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(file = %path.display(), error = %e, "could not remove staged file"),
    }
}
