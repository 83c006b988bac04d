use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use content_core::{ResourceType, Space};
use serde::{Deserialize, Serialize};

use crate::diff::{ChangeOperation, ChangeSet};
use crate::resource::Resource;
use crate::store::Precondition;

/// Changes needed to bring `target` in line with `space`.
///
/// Serializes as `{"space": ..., "target": ..., "changes": {"<type>": [...]}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionPreview {
    pub space: Space,
    pub target: Space,
    pub changes: ChangeSet,
}

impl PromotionPreview {
    /// Total number of change entries across all types.
    pub fn len(&self) -> usize {
        self.changes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Turn the preview into a request that promotes everything it lists.
    pub fn into_request(self) -> PromotionRequest {
        PromotionRequest {
            space: self.space,
            changes: self.changes,
        }
    }
}

/// Body of a promotion: the source space and the changes to apply to the
/// next space. `delete` is accepted as an alias of `remove`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionRequest {
    pub space: Space,
    #[serde(default)]
    pub changes: ChangeSet,
}

/// A write planned against the target space.
#[derive(Debug, Clone)]
pub struct PlannedWrite {
    pub operation: ChangeOperation,
    /// Already placed in the target space.
    pub resource: Resource,
    pub precondition: Precondition,
}

/// A delete planned against the target space.
#[derive(Debug, Clone)]
pub struct PlannedDelete {
    pub resource_type: ResourceType,
    pub id: String,
    pub precondition: Precondition,
    /// The record is a singleton being replaced under a new id, not a
    /// requested `remove`.
    pub superseded: bool,
}

/// Everything a promotion will do, gathered before anything is written.
///
/// This is what a [`PromotionValidator`](super::PromotionValidator) inspects.
#[derive(Debug, Clone)]
pub struct PromotionPlan {
    pub source: Space,
    pub target: Space,
    pub writes: Vec<PlannedWrite>,
    pub deletes: Vec<PlannedDelete>,
    /// `remove` entries whose target record was already gone.
    pub skipped: Vec<(ResourceType, String)>,
}

impl PromotionPlan {
    pub(super) fn new(source: Space, target: Space) -> Self {
        Self {
            source,
            target,
            writes: Vec::new(),
            deletes: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Documents the plan would leave in the target space for one type.
    pub fn resources_of(&self, resource_type: ResourceType) -> impl Iterator<Item = &Resource> {
        self.writes
            .iter()
            .map(|w| &w.resource)
            .filter(move |r| r.resource_type == resource_type)
    }

    pub(super) fn counts(&self) -> BTreeMap<ResourceType, ChangeCounts> {
        let mut counts: BTreeMap<ResourceType, ChangeCounts> = BTreeMap::new();
        for w in &self.writes {
            let entry = counts.entry(w.resource.resource_type).or_default();
            match w.operation {
                ChangeOperation::Add => entry.added += 1,
                ChangeOperation::Update => entry.updated += 1,
                ChangeOperation::Remove => {}
            }
        }
        for d in self.deletes.iter().filter(|d| !d.superseded) {
            counts.entry(d.resource_type).or_default().removed += 1;
        }
        for (resource_type, _) in &self.skipped {
            counts.entry(*resource_type).or_default().skipped += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeCounts {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub skipped: usize,
}

impl ChangeCounts {
    pub fn applied(&self) -> usize {
        self.added + self.updated + self.removed
    }
}

/// Outcome of a completed promotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionReport {
    pub space: Space,
    pub target: Space,
    pub promoted_at: DateTime<Utc>,
    pub results: BTreeMap<ResourceType, ChangeCounts>,
}

impl PromotionReport {
    pub fn total_applied(&self) -> usize {
        self.results.values().map(ChangeCounts::applied).sum()
    }
}
