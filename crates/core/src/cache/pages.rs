//! Cached page storage.

use std::time::Duration;

use super::connection::CacheDb;
use crate::Error;
use chrono::{DateTime, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Freshness policy applied when a page is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Never expires. Used for same-origin pages.
    Forever,
    /// Expires after the given window.
    Fresh(Duration),
}

impl CachePolicy {
    fn expires_at(self, fetched_at: DateTime<Utc>) -> Option<String> {
        match self {
            CachePolicy::Forever => None,
            CachePolicy::Fresh(ttl) => {
                let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
                Some(fetched_at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC).to_rfc3339())
            }
        }
    }
}

/// A cached response body.
#[derive(Debug, Clone)]
pub struct CachedPage {
    pub hash: String,
    pub url: String,
    pub final_url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub fetched_at: String,
    pub expires_at: Option<String>,
}

impl CachedPage {
    /// Build a cache row for `url`, stamping it now under `policy`.
    pub fn new(
        url: &str, final_url: &str, status_code: u16, content_type: Option<String>, body: Vec<u8>,
        policy: CachePolicy,
    ) -> Self {
        let now = Utc::now();
        Self {
            hash: super::hash::compute_cache_key(url),
            url: url.to_string(),
            final_url: final_url.to_string(),
            status_code,
            content_type,
            body,
            fetched_at: now.to_rfc3339(),
            expires_at: policy.expires_at(now),
        }
    }
}

impl CacheDb {
    /// Insert or replace a cached page.
    pub async fn upsert_page(&self, page: &CachedPage) -> Result<(), Error> {
        let page = page.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO pages (
                    hash, url, final_url, status_code, content_type, body, fetched_at, expires_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(hash) DO UPDATE SET
                    url = excluded.url,
                    final_url = excluded.final_url,
                    status_code = excluded.status_code,
                    content_type = excluded.content_type,
                    body = excluded.body,
                    fetched_at = excluded.fetched_at,
                    expires_at = excluded.expires_at",
                    params![
                        &page.hash,
                        &page.url,
                        &page.final_url,
                        page.status_code as i64,
                        &page.content_type,
                        &page.body,
                        &page.fetched_at,
                        &page.expires_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get a page by hash if it has not expired.
    pub async fn get_fresh_page(&self, hash: &str) -> Result<Option<CachedPage>, Error> {
        let hash = hash.to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<Option<CachedPage>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT hash, url, final_url, status_code, content_type, body, fetched_at, expires_at
                FROM pages WHERE hash = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                )?;

                let result = stmt.query_row(params![hash, now], |row| {
                    Ok(CachedPage {
                        hash: row.get(0)?,
                        url: row.get(1)?,
                        final_url: row.get(2)?,
                        status_code: row.get::<_, i64>(3)? as u16,
                        content_type: row.get(4)?,
                        body: row.get(5)?,
                        fetched_at: row.get(6)?,
                        expires_at: row.get(7)?,
                    })
                });

                match result {
                    Ok(p) => Ok(Some(p)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete expired pages. Returns the number of deleted entries.
    pub async fn purge_expired_pages(&self) -> Result<u64, Error> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM pages WHERE expires_at IS NOT NULL AND expires_at < ?1",
                    params![now],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
