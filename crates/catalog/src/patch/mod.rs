//! Path-addressed document patching.
//!
//! [`apply`] mutates the document **in place** and is **not transactional**:
//! when operation `n` fails, operations `0..n` stay applied. Callers that need
//! all-or-nothing behaviour patch a clone and keep the original on failure
//! (see `ResourceEditor::patch`).
//!
//! Semantics differ from RFC 6902 in two places:
//! - `replace` is `remove` followed by `add`, and a missing target does not
//!   stop the `add` step, so replacing an absent key creates it.
//! - `add` at the root replaces the document with the value's object content,
//!   or with an empty object when the value is not an object.

mod error;
mod pointer;

pub use error::{OpKind, PatchError, PatchFailure};

use content_core::document::{deep_eq, DocumentMap, DocumentTree};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use pointer::{parent_mut, parent_ref, parse_index, parse_path, within};

/// A single patch operation. Wire shape:
/// `{"op": "add", "path": "/a/b/0", "value": ..., "from": "/a/c"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    Add {
        path: String,
        #[serde(default)]
        value: DocumentTree,
    },
    Remove {
        path: String,
    },
    Replace {
        path: String,
        #[serde(default)]
        value: DocumentTree,
    },
    Move {
        from: String,
        path: String,
    },
    Copy {
        from: String,
        path: String,
    },
    Test {
        path: String,
        #[serde(default)]
        value: DocumentTree,
    },
}

impl PatchOperation {
    pub fn kind(&self) -> OpKind {
        match self {
            PatchOperation::Add { .. } => OpKind::Add,
            PatchOperation::Remove { .. } => OpKind::Remove,
            PatchOperation::Replace { .. } => OpKind::Replace,
            PatchOperation::Move { .. } => OpKind::Move,
            PatchOperation::Copy { .. } => OpKind::Copy,
            PatchOperation::Test { .. } => OpKind::Test,
        }
    }

    /// Target path of the operation.
    pub fn path(&self) -> &str {
        match self {
            PatchOperation::Add { path, .. }
            | PatchOperation::Remove { path }
            | PatchOperation::Replace { path, .. }
            | PatchOperation::Move { path, .. }
            | PatchOperation::Copy { path, .. }
            | PatchOperation::Test { path, .. } => path,
        }
    }
}

/// Parse a JSON array of operations.
///
/// Unsupported `op` names and malformed operations are reported as
/// [`PatchError::InvalidArgument`] together with their position.
pub fn parse_operations(patch: &Value) -> Result<Vec<PatchOperation>, PatchFailure> {
    let Some(items) = patch.as_array() else {
        return Err(PatchFailure {
            index: 0,
            error: PatchError::InvalidArgument {
                op: "patch".into(),
                path: String::new(),
                reason: "expected a JSON array of operations".into(),
            },
        });
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_operation(item).map_err(|error| PatchFailure { index, error }))
        .collect()
}

fn parse_operation(item: &Value) -> Result<PatchOperation, PatchError> {
    let name = item.get("op").and_then(Value::as_str).unwrap_or_default();
    let path = item
        .get("path")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if OpKind::from_name(name).is_none() {
        return Err(PatchError::InvalidArgument {
            op: name.to_string(),
            path,
            reason: format!("unsupported JSON Patch operation: '{name}'"),
        });
    }
    serde_json::from_value(item.clone()).map_err(|e| PatchError::InvalidArgument {
        op: name.to_string(),
        path,
        reason: e.to_string(),
    })
}

/// Apply `ops` in order, mutating `document` in place.
///
/// Stops at the first failing operation; earlier operations stay applied.
pub fn apply(document: &mut DocumentTree, ops: &[PatchOperation]) -> Result<(), PatchFailure> {
    for (index, op) in ops.iter().enumerate() {
        debug!(index, op = %op.kind(), path = op.path(), "applying patch operation");
        if let Err(error) = apply_op(document, op) {
            warn!(index, op = %op.kind(), error = %error, "patch operation failed");
            return Err(PatchFailure { index, error });
        }
    }
    Ok(())
}

/// Apply a single operation in place.
pub fn apply_op(document: &mut DocumentTree, op: &PatchOperation) -> Result<(), PatchError> {
    match op {
        PatchOperation::Add { path, value } => add(document, path, value.clone(), OpKind::Add),
        PatchOperation::Remove { path } => remove(document, path, OpKind::Remove).map(drop),
        PatchOperation::Replace { path, value } => replace(document, path, value.clone()),
        PatchOperation::Move { from, path } => {
            resolve_source(document, from, OpKind::Move)?;
            let value = remove(document, from, OpKind::Move)?;
            add(document, path, value, OpKind::Move)
        }
        PatchOperation::Copy { from, path } => {
            let value = resolve_source(document, from, OpKind::Copy)?.clone();
            add(document, path, value, OpKind::Copy)
        }
        PatchOperation::Test { path, value } => test(document, path, value),
    }
}

fn add(document: &mut DocumentTree, path: &str, value: DocumentTree, op: OpKind) -> Result<(), PatchError> {
    let tokens = parse_path(path, op)?;
    let Some((last, parents)) = tokens.split_last() else {
        *document = Value::Object(match value {
            Value::Object(map) => map,
            _ => DocumentMap::new(),
        });
        return Ok(());
    };

    match parent_mut(document, parents, op, path)? {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(items) => {
            if last == "-" {
                items.push(value);
                return Ok(());
            }
            let index = parse_index(last, op, path)?;
            // Inserting at `len` is allowed: it appends.
            match usize::try_from(index).ok().filter(|&i| i <= items.len()) {
                Some(i) => {
                    items.insert(i, value);
                    Ok(())
                }
                None => Err(PatchError::out_of_bounds(op, path, index)),
            }
        }
        _ => Err(PatchError::invalid(op, path, "target is not a container")),
    }
}

/// Remove and return the value at `path`. The root is cleared to `{}`.
fn remove(document: &mut DocumentTree, path: &str, op: OpKind) -> Result<DocumentTree, PatchError> {
    let tokens = parse_path(path, op)?;
    let Some((last, parents)) = tokens.split_last() else {
        return Ok(std::mem::replace(document, Value::Object(DocumentMap::new())));
    };

    match parent_mut(document, parents, op, path)? {
        Value::Object(map) => map
            .shift_remove(last.as_str())
            .ok_or_else(|| PatchError::not_found(op, path)),
        Value::Array(items) => {
            let index = parse_index(last, op, path)?;
            match within(index, items.len()) {
                Some(i) => Ok(items.remove(i)),
                None => Err(PatchError::out_of_bounds(op, path, index)),
            }
        }
        _ => Err(PatchError::invalid(op, path, "target is not a container")),
    }
}

fn replace(document: &mut DocumentTree, path: &str, value: DocumentTree) -> Result<(), PatchError> {
    match remove(document, path, OpKind::Replace) {
        Ok(_) => {}
        // Nothing to remove: the add step decides the outcome.
        Err(PatchError::PathNotFound { .. }) | Err(PatchError::IndexOutOfBounds { .. }) => {}
        Err(e) => return Err(e),
    }
    add(document, path, value, OpKind::Replace)
}

/// Locate the value a `move`/`copy` reads from.
fn resolve_source<'a>(document: &'a DocumentTree, from: &str, op: OpKind) -> Result<&'a DocumentTree, PatchError> {
    let tokens = parse_path(from, op)?;
    let Some((last, parents)) = tokens.split_last() else {
        return Err(PatchError::invalid(op, from, "the document root cannot be a source"));
    };
    let parent = parent_ref(document, parents, op, from)
        .map_err(|_| PatchError::invalid(op, from, "could not retrieve source value"))?;

    match parent {
        Value::Object(map) => map.get(last.as_str()).ok_or_else(|| {
            PatchError::invalid(op, from, format!("source key '{last}' does not exist"))
        }),
        Value::Array(items) => {
            let index = parse_index(last, op, from)?;
            within(index, items.len())
                .map(|i| &items[i])
                .ok_or_else(|| PatchError::out_of_bounds(op, from, index))
        }
        _ => Err(PatchError::invalid(op, from, "could not retrieve source value")),
    }
}

fn test(document: &DocumentTree, path: &str, expected: &DocumentTree) -> Result<(), PatchError> {
    let op = OpKind::Test;
    let tokens = parse_path(path, op)?;
    let actual = match tokens.split_last() {
        None => Some(document),
        Some((last, parents)) => match parent_ref(document, parents, op, path)? {
            Value::Object(map) => map.get(last.as_str()),
            Value::Array(items) => {
                let index = parse_index(last, op, path)?;
                match within(index, items.len()) {
                    Some(i) => Some(&items[i]),
                    None => return Err(PatchError::out_of_bounds(op, path, index)),
                }
            }
            _ => None,
        },
    };

    match actual {
        Some(v) if deep_eq(v, expected) => Ok(()),
        _ => Err(PatchError::TestMismatch {
            path: path.to_string(),
        }),
    }
}
