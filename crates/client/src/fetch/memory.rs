//! In-memory page source for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use edsite_core::Error;

use super::{FetchResponse, PageSource, canonicalize};

/// Serves registered bodies and answers 404 for everything else.
#[derive(Default)]
pub(crate) struct MemorySource {
    pages: HashMap<String, Result<Vec<u8>, u16>>,
    requests: Mutex<Vec<String>>,
}

impl MemorySource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn key(url: &str) -> String {
        canonicalize(url).map(|u| u.to_string()).unwrap_or_else(|_| url.to_string())
    }

    pub(crate) fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(Self::key(url), Ok(body.as_bytes().to_vec()));
        self
    }

    pub(crate) fn binary(mut self, url: &str, body: &[u8]) -> Self {
        self.pages.insert(Self::key(url), Ok(body.to_vec()));
        self
    }

    pub(crate) fn failing(mut self, url: &str, status: u16) -> Self {
        self.pages.insert(Self::key(url), Err(status));
        self
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for MemorySource {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, Error> {
        let canonical = canonicalize(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        self.requests.lock().unwrap().push(canonical.to_string());

        match self.pages.get(canonical.as_str()) {
            Some(Ok(body)) => Ok(FetchResponse {
                url: canonical.clone(),
                final_url: canonical,
                status: 200,
                content_type: Some("text/html".into()),
                bytes: Bytes::from(body.clone()),
                fetch_ms: 0,
                from_cache: false,
            }),
            Some(Err(status)) => Err(Error::HttpStatus { url: canonical.to_string(), status: *status }),
            None => Err(Error::HttpStatus { url: canonical.to_string(), status: 404 }),
        }
    }
}
