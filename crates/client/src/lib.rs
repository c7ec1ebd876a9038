//! Harvesting client for EDSITEment.
//!
//! This crate provides the fetch pipeline, markup extraction, resource
//! classification, media download, archive assembly and the pipeline driver
//! used by the CLI.

pub mod archive;
pub mod classify;
pub mod extract;
pub mod fetch;
pub mod media;
pub mod pipeline;
pub mod walker;

pub use archive::{Assembler, Catalog, ChannelInfo, ContentKind, ManifestCatalog, MaterializedFile, SourceRef};
pub use classify::{ClassifiedResource, Materializer, classify};
pub use fetch::{FetchClient, FetchConfig, FetchResponse, PageSource};
pub use media::{MediaPlatform, MediaPolicy, YtDlp};
pub use pipeline::{Pipeline, RunSummary};
pub use walker::{Bounds, LeafPage, WalkConfig, WalkMode, Walker};
