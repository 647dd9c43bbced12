//! Content hashing for cache keys and deduplicated asset names.
//!
//! Produces a SHA-256 hash of text or raw bytes, so AI responses and stored
//! image payloads get stable, collision-resistant identifiers across runs.

use sha2::{Digest, Sha256};

/// A content hash digest (SHA-256, 32 bytes).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash {
    bytes: [u8; 32],
}

impl ContentHash {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Compute the content hash of a text input.
pub fn hash_text(input: &str) -> ContentHash {
    hash_bytes(input.as_bytes())
}

/// Compute the content hash of a byte slice.
pub fn hash_bytes(bytes: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    ContentHash::from_bytes(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(hash_text("hello"), hash_text("hello"));
    }

    #[test]
    fn test_hash_different_content() {
        assert_ne!(hash_text("hello"), hash_text("world"));
    }

    #[test]
    fn test_hash_hex_format() {
        let hex = hash_text("hello").to_hex();
        assert_eq!(hex.len(), 64); // SHA-256 = 64 hex chars
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_display() {
        let hash = hash_bytes(b"payload");
        assert_eq!(format!("{}", hash), hash.to_hex());
    }
}
