use content_core::ResourceType;
use thiserror::Error;

use crate::resource::ResourceError;

/// Errors produced by [`ContentStore`](super::ContentStore) implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// The record changed between read and write.
    #[error("conflicting write on {resource_type} [{id}]: expected {expected}, found {actual}")]
    Conflict {
        resource_type: ResourceType,
        id: String,
        expected: String,
        actual: String,
    },
    #[error("invalid stored record: {0}")]
    InvalidRecord(#[from] ResourceError),
}

/// Convert a resource id to a safe JSON filename.
///
/// `%` and `/` are percent-encoded, so distinct ids never share a file.
pub(super) fn record_filename(id: &str) -> String {
    let mut name = String::with_capacity(id.len() + 5);
    for c in id.chars() {
        match c {
            '%' => name.push_str("%25"),
            '/' => name.push_str("%2F"),
            c => name.push(c),
        }
    }
    name.push_str(".json");
    name
}

/// Reverse of [`record_filename`] for a `.json` stem. `None` when the stem
/// holds an escape [`record_filename`] never writes.
pub(super) fn id_from_stem(stem: &str) -> Option<String> {
    let mut id = String::with_capacity(stem.len());
    let mut rest = stem;
    while let Some(pos) = rest.find('%') {
        id.push_str(&rest[..pos]);
        let escape = rest.get(pos..pos + 3)?;
        match escape {
            "%25" => id.push('%'),
            "%2F" => id.push('/'),
            _ => return None,
        }
        rest = &rest[pos + 3..];
    }
    id.push_str(rest);
    Some(id)
}
