//! Cache key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key for a canonical page URL.
pub fn compute_cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_cache_key("http://edsitement.neh.gov/lesson-plans");
        let hash2 = compute_cache_key("http://edsitement.neh.gov/lesson-plans");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_differs_by_query() {
        let a = compute_cache_key("http://edsitement.neh.gov/student-resources/all?subject=25");
        let b = compute_cache_key("http://edsitement.neh.gov/student-resources/all?subject=21");
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_cache_key("https://example.com");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
