//! Content hashing for duplicate detection.

use base64::Engine;
use sha2::{Digest, Sha256};

/// Stable fingerprint of a document's bytes: base64 of the sha256 digest.
/// Identical uploads hash identically regardless of filename or mime.
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    base64::engine::general_purpose::STANDARD.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_bytes_same_hash() {
        assert_eq!(content_hash(b"boarding pass"), content_hash(b"boarding pass"));
    }

    #[test]
    fn different_bytes_different_hash() {
        assert_ne!(content_hash(b"boarding pass"), content_hash(b"hotel voucher"));
    }

    #[test]
    fn hash_is_fixed_length() {
        // 32 digest bytes -> 44 base64 chars including padding
        assert_eq!(content_hash(b"").len(), 44);
        assert_eq!(content_hash(&vec![0u8; 100_000]).len(), 44);
    }
}
