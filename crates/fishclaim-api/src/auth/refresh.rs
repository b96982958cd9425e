//! Refresh token generation and hashing
//!
//! Refresh tokens are opaque random secrets. Only the SHA-256 digest is ever
//! stored; the raw value is handed to the client once and cannot be recovered.

use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Number of random bytes in a refresh token (256 bits)
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// A freshly generated refresh token and its storage digest
#[derive(Debug, Clone)]
pub struct GeneratedRefreshToken {
    /// Raw value returned to the client
    pub raw: String,
    /// Hex SHA-256 digest of `raw`, the only form persisted
    pub hash: String,
}

/// Generate a cryptographically secure refresh token
pub fn generate() -> GeneratedRefreshToken {
    let mut rng = rand::thread_rng();
    let token_bytes: [u8; REFRESH_TOKEN_BYTES] = rng.gen();
    let raw = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(token_bytes);
    let hash = hash_refresh_token(&raw);

    GeneratedRefreshToken { raw, hash }
}

/// Digest a raw refresh token for storage or lookup
pub fn hash_refresh_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_token_shape() {
        let token = generate();

        // 32 bytes base64url without padding
        assert_eq!(token.raw.len(), 43);
        assert!(!token.raw.contains('='));
        assert!(token
            .raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));

        assert_eq!(token.hash.len(), 64);
        assert_eq!(token.hash, hash_refresh_token(&token.raw));
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = generate();
        let b = generate();
        assert_ne!(a.raw, b.raw);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash_refresh_token("abc"), hash_refresh_token("abc"));
        assert_eq!(
            hash_refresh_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(hash_refresh_token("abc"), hash_refresh_token("abd"));
    }
}
