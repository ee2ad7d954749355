//! Commit identity hashing using SHA-256.

use sha2::{Digest, Sha256};

/// Number of hex characters in an abbreviated commit id.
pub const SHORT_ID_LEN: usize = 6;

/// Hash a sequence of fields into a lowercase hex digest.
///
/// Each field is length-prefixed so that `["ab", "c"]` and `["a", "bc"]`
/// produce different digests.
pub fn hash_fields<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field);
    }
    hex_encode(&hasher.finalize())
}

/// The abbreviated form of a full commit id.
pub fn short_id(full: &str) -> &str {
    &full[..SHORT_ID_LEN.min(full.len())]
}

/// Encode raw bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_one(s: &str) -> String {
        hash_fields([s.as_bytes()])
    }

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(hash_one("hello world"), hash_one("hello world"));
    }

    #[test]
    fn test_hash_length() {
        // SHA-256 produces 64 hex characters
        assert_eq!(hash_one("test").len(), 64);
    }

    #[test]
    fn test_field_boundaries_matter() {
        let a = hash_fields([b"ab".as_slice(), b"c".as_slice()]);
        let b = hash_fields([b"a".as_slice(), b"bc".as_slice()]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_id() {
        let full = hash_one("commit");
        assert_eq!(short_id(&full).len(), SHORT_ID_LEN);
        assert!(full.starts_with(short_id(&full)));
        assert_eq!(short_id("abc"), "abc");
    }
}
