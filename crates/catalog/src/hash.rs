use content_core::document::{canonical_json, DocumentTree};
use sha2::{Digest, Sha256};

/// SHA-256 hex digest of a document's canonical serialization.
///
/// Keys are sorted before hashing, so documents that differ only in object
/// key order share a digest. This is what lets the diff engine compare spaces
/// by digest alone.
pub fn content_digest(document: &DocumentTree) -> String {
    sha256_hex(canonical_json(document).as_bytes())
}

/// Digest over an ordered sequence of digests, concatenated without separator.
///
/// Order matters: callers are responsible for a deterministic ordering.
pub fn aggregate_digest<'a>(digests: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for d in digests {
        hasher.update(d.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{digest:x}")
}
