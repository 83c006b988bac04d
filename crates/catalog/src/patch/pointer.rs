//! Slash-delimited path handling shared by the patch operations.

use serde_json::Value;

use super::error::{OpKind, PatchError};

/// Split a path into unescaped tokens. The empty path is the root (no tokens).
pub(super) fn parse_path(path: &str, op: OpKind) -> Result<Vec<String>, PatchError> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = path.strip_prefix('/') else {
        return Err(PatchError::invalid(op, path, "path must be empty or start with '/'"));
    };
    Ok(rest.split('/').map(unescape).collect())
}

// `~1` must be decoded before `~0`, otherwise `~01` would wrongly become `/`.
fn unescape(token: &str) -> String {
    if token.contains('~') {
        token.replace("~1", "/").replace("~0", "~")
    } else {
        token.to_string()
    }
}

/// Parse an array index token. Any integer parses (range is checked by the
/// caller); anything else is an invalid argument.
pub(super) fn parse_index(token: &str, op: OpKind, path: &str) -> Result<i64, PatchError> {
    token
        .parse::<i64>()
        .map_err(|_| PatchError::invalid(op, path, format!("invalid array index '{token}'")))
}

/// `index` as a position inside `0..len`, if it is one.
pub(super) fn within(index: i64, len: usize) -> Option<usize> {
    usize::try_from(index).ok().filter(|&i| i < len)
}

fn child_mut<'a>(node: &'a mut Value, token: &str) -> Option<&'a mut Value> {
    match node {
        Value::Object(map) => map.get_mut(token),
        Value::Array(items) => {
            let i = token.parse::<usize>().ok()?;
            items.get_mut(i)
        }
        _ => None,
    }
}

fn child<'a>(node: &'a Value, token: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(token),
        Value::Array(items) => {
            let i = token.parse::<usize>().ok()?;
            items.get(i)
        }
        _ => None,
    }
}

/// Walk `parents` from the document root.
pub(super) fn parent_mut<'a>(
    document: &'a mut Value,
    parents: &[String],
    op: OpKind,
    path: &str,
) -> Result<&'a mut Value, PatchError> {
    let mut current = document;
    for token in parents {
        current = child_mut(current, token).ok_or_else(|| PatchError::not_found(op, path))?;
    }
    Ok(current)
}

pub(super) fn parent_ref<'a>(
    document: &'a Value,
    parents: &[String],
    op: OpKind,
    path: &str,
) -> Result<&'a Value, PatchError> {
    let mut current = document;
    for token in parents {
        current = child(current, token).ok_or_else(|| PatchError::not_found(op, path))?;
    }
    Ok(current)
}
