use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operation kind, used to label errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Add,
    Remove,
    Replace,
    Move,
    Copy,
    Test,
}

impl OpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::Add => "add",
            OpKind::Remove => "remove",
            OpKind::Replace => "replace",
            OpKind::Move => "move",
            OpKind::Copy => "copy",
            OpKind::Test => "test",
        }
    }

    pub fn from_name(name: &str) -> Option<OpKind> {
        match name {
            "add" => Some(OpKind::Add),
            "remove" => Some(OpKind::Remove),
            "replace" => Some(OpKind::Replace),
            "move" => Some(OpKind::Move),
            "copy" => Some(OpKind::Copy),
            "test" => Some(OpKind::Test),
            _ => None,
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single patch operation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PatchError {
    #[error("path not found for {op} operation: {path}")]
    PathNotFound { op: OpKind, path: String },

    #[error("index {index} out of bounds for {op} operation: {path}")]
    IndexOutOfBounds { op: OpKind, path: String, index: i64 },

    /// `op` is a string because unsupported operation names land here too.
    #[error("invalid argument for {op} operation at '{path}': {reason}")]
    InvalidArgument {
        op: String,
        path: String,
        reason: String,
    },

    #[error("test operation failed at {path}: value does not match")]
    TestMismatch { path: String },
}

impl PatchError {
    pub(crate) fn invalid(op: OpKind, path: &str, reason: impl Into<String>) -> Self {
        PatchError::InvalidArgument {
            op: op.to_string(),
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(op: OpKind, path: &str) -> Self {
        PatchError::PathNotFound {
            op,
            path: path.to_string(),
        }
    }

    pub(crate) fn out_of_bounds(op: OpKind, path: &str, index: i64) -> Self {
        PatchError::IndexOutOfBounds {
            op,
            path: path.to_string(),
            index,
        }
    }
}

/// A patch sequence stopped at operation `index`.
///
/// Operations before `index` remain applied.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("patch operation #{index} failed: {error}")]
pub struct PatchFailure {
    pub index: usize,
    #[source]
    pub error: PatchError,
}
