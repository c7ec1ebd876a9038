//! SQLite-backed page cache for the fetch pipeline.
//!
//! Pages are keyed by a SHA-256 of their canonical URL. Two freshness
//! policies are stored per row:
//!
//! - `expires_at = NULL`: cache forever (pages on the source site)
//! - `expires_at = <timestamp>`: standard freshness window (everything else)

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod pages;

pub use crate::Error;

pub use connection::CacheDb;
pub use pages::{CachePolicy, CachedPage};
