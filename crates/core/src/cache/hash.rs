//! Request keys for cache entries.

use sha2::{Digest, Sha256};

/// Key a cached entry by request method and canonical URL.
///
/// Header-dependent variants are distinguished at match time through the
/// stored `Vary` list, not through the key.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
