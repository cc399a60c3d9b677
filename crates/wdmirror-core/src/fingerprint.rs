//! Cache fingerprints: deterministic hash of a request URL.

use sha2::{Digest, Sha256};

/// Computes the cache key for a request URL: SHA-256 of the URL string as
/// lowercase hex. Collision-free in practice; opaque to callers.
pub fn fingerprint(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        assert_eq!(
            fingerprint("http://example.com/a.jpg"),
            fingerprint("http://example.com/a.jpg")
        );
    }

    #[test]
    fn distinct_urls_distinct_keys() {
        assert_ne!(
            fingerprint("http://example.com/a.jpg"),
            fingerprint("http://example.com/b.jpg")
        );
    }

    #[test]
    fn lowercase_hex_of_sha256() {
        let fp = fingerprint("");
        assert_eq!(fp.len(), 64);
        // SHA-256 of the empty string.
        assert_eq!(
            fp,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
