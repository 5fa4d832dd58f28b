//! Content digest of the fixture bundle, used for cache validation.

use sha2::{Digest, Sha256};

/// Prefix carried by every bundle digest.
pub const DIGEST_PREFIX: &str = "sha256:";

/// `sha256:<lowercase hex>` of the exact bytes served to clients.
pub fn digest_bytes(bytes: &[u8]) -> String {
    format!("{}{}", DIGEST_PREFIX, hex::encode(Sha256::digest(bytes)))
}
