//! Changeset computation between two spaces.
//!
//! Collections are compared by digest inventories (`id -> digest`). The
//! singleton policy is compared by content with its `id` ignored, because
//! each space carries its own policy id.

use std::collections::BTreeMap;

use content_core::document::{deep_eq, document_id, without_key, DocumentTree, ID_KEY};
use content_core::{ResourceType, Space};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `id -> digest` for one resource type in one space. Sorted by id, which
/// makes changesets deterministic.
pub type Inventory = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOperation {
    Add,
    Update,
    #[serde(alias = "delete")]
    Remove,
}

impl ChangeOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeOperation::Add => "add",
            ChangeOperation::Update => "update",
            ChangeOperation::Remove => "remove",
        }
    }
}

impl std::fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a changeset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub operation: ChangeOperation,
    pub id: String,
}

impl Change {
    pub fn add(id: impl Into<String>) -> Self {
        Self { operation: ChangeOperation::Add, id: id.into() }
    }

    pub fn update(id: impl Into<String>) -> Self {
        Self { operation: ChangeOperation::Update, id: id.into() }
    }

    pub fn remove(id: impl Into<String>) -> Self {
        Self { operation: ChangeOperation::Remove, id: id.into() }
    }
}

/// Changes per resource type.
pub type ChangeSet = BTreeMap<ResourceType, Vec<Change>>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiffError {
    #[error("no {resource_type} document found in space [{space}]")]
    MissingSingleton {
        resource_type: ResourceType,
        space: Space,
    },

    #[error("cannot compare {resource_type} documents: {reason}")]
    ComparisonFailed {
        resource_type: ResourceType,
        reason: String,
    },
}

/// Changes needed to make `target` match `source`.
///
/// Adds and updates come first, in source id order, followed by removes in
/// target id order. Ids with equal digests on both sides are omitted.
pub fn diff(source: &Inventory, target: &Inventory) -> Vec<Change> {
    let mut changes = Vec::new();

    for (id, source_digest) in source {
        match target.get(id) {
            None => changes.push(Change::add(id.as_str())),
            Some(target_digest) if target_digest != source_digest => {
                changes.push(Change::update(id.as_str()))
            }
            Some(_) => {}
        }
    }

    changes.extend(
        target
            .keys()
            .filter(|id| !source.contains_key(*id))
            .map(|id| Change::remove(id.as_str())),
    );

    changes
}

/// One side of a singleton comparison.
#[derive(Debug, Clone, Copy)]
pub struct SingletonSide<'a> {
    pub space: Space,
    pub document: Option<&'a DocumentTree>,
}

/// Compare two singleton documents, ignoring their top-level `id`.
///
/// Emits at most one `update` carrying the **source** id. A missing document
/// on either side is an error rather than "no change".
pub fn diff_singleton(
    resource_type: ResourceType,
    source: SingletonSide<'_>,
    target: SingletonSide<'_>,
) -> Result<Vec<Change>, DiffError> {
    let missing = |space| DiffError::MissingSingleton { resource_type, space };
    let source_doc = source.document.ok_or_else(|| missing(source.space))?;
    let target_doc = target.document.ok_or_else(|| missing(target.space))?;

    if !source_doc.is_object() || !target_doc.is_object() {
        return Err(DiffError::ComparisonFailed {
            resource_type,
            reason: "documents must be JSON objects".into(),
        });
    }
    let source_id = document_id(source_doc).ok_or_else(|| DiffError::ComparisonFailed {
        resource_type,
        reason: format!("source document in space [{}] has no string id", source.space),
    })?;

    let unchanged = deep_eq(&without_key(source_doc, ID_KEY), &without_key(target_doc, ID_KEY));
    if unchanged {
        Ok(Vec::new())
    } else {
        Ok(vec![Change::update(source_id)])
    }
}
