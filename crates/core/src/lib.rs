//! Core types and shared functionality for edsite-harvest.
//!
//! This crate provides:
//! - Page cache with SQLite backend
//! - Unified error types
//! - Layered configuration
//! - Hierarchy paths and the metadata record attached to published artifacts

pub mod cache;
pub mod config;
pub mod error;
pub mod metadata;
pub mod path;

pub use cache::{CacheDb, CachePolicy, CachedPage};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use metadata::{Metadata, MetadataDefaults};
pub use path::HierarchyPath;
