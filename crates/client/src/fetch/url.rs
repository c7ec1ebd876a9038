//! URL canonicalization and site membership.

use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a URL string for consistent caching.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve an href found on a page of `base` into an absolute URL string.
///
/// Hrefs that cannot be joined are returned trimmed but unchanged.
pub fn resolve(base: &Url, href: &str) -> String {
    let href = href.trim();
    match base.join(href) {
        Ok(u) => u.to_string(),
        Err(_) => href.to_string(),
    }
}

/// Whether `host` is the site host or one of its subdomains.
pub fn host_matches(host: &str, site: &str) -> bool {
    let host = host.trim_start_matches("www.");
    let site = site.trim_start_matches("www.");
    host.eq_ignore_ascii_case(site)
        || (host.len() > site.len()
            && host.to_ascii_lowercase().ends_with(&format!(".{}", site.to_ascii_lowercase())))
}

/// Whether `url` lives on the site rooted at `base`, ignoring the scheme.
pub fn is_same_site(url: &Url, base: &Url) -> bool {
    match (url.host_str(), base.host_str()) {
        (Some(host), Some(site)) => host_matches(host, site),
        _ => false,
    }
}

/// Final path segment of a URL, percent-decoding left to the caller.
pub fn file_name(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(u) => u.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    path.rsplit('/').next().unwrap_or_default().to_string()
}

/// Final path segment with its last extension removed.
pub fn file_stem(url: &str) -> String {
    let name = file_name(url);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name,
    }
}

/// Lower-cased extension of the final path segment, if any.
pub fn file_extension(url: &str) -> Option<String> {
    let name = file_name(url);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_ascii_lowercase()),
        _ => None,
    }
}
