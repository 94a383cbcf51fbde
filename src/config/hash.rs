//! Content hashing for change detection.
//!
//! The compose manifest and the release build are compared by digest only,
//! so equal digests are treated as equal content.

use sha2::{Digest, Sha256};

/// Returns the lowercase hex SHA-256 digest of a string.
#[must_use]
pub fn sha256(content: &str) -> String {
    sha256_bytes(content.as_bytes())
}

/// Returns the lowercase hex SHA-256 digest of raw bytes.
#[must_use]
pub fn sha256_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Hasher for computing content digests.
#[derive(Debug, Default)]
pub struct ContentHasher;

impl ContentHasher {
    /// Creates a new content hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the digest of a compose manifest.
    #[must_use]
    pub fn hash_manifest(&self, manifest: &str) -> String {
        sha256(manifest)
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }

    /// Compares two hashes to determine if they are equal.
    #[must_use]
    pub fn hashes_match(hash1: &str, hash2: &str) -> bool {
        if hash1.len() != hash2.len() {
            return false;
        }

        hash1
            .bytes()
            .zip(hash2.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            sha256("hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(
            sha256(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_digest_shape() {
        let hash = sha256("ünïcödé ✓");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_deterministic_and_distinct() {
        assert_eq!(sha256("deterministic"), sha256("deterministic"));
        assert_ne!(sha256("input A"), sha256("input B"));
        assert_eq!(sha256("same"), sha256_bytes(b"same"));
    }

    #[test]
    fn test_short_hash() {
        let hasher = ContentHasher::new();
        let short = hasher.short_hash("abcdef1234567890abcdef1234567890");

        assert_eq!(short, "abcdef12");
        assert_eq!(hasher.short_hash("abc"), "abc");
    }

    #[test]
    fn test_hashes_match() {
        assert!(ContentHasher::hashes_match("abc123", "abc123"));
        assert!(!ContentHasher::hashes_match("abc123", "abc124"));
        assert!(!ContentHasher::hashes_match("abc123", "abc12"));
        assert!(ContentHasher::hashes_match("", ""));
    }
}
