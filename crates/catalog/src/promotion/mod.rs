//! Space-to-space promotion: preview a changeset, then apply it.
//!
//! A promotion runs in four phases. The request is validated, the target
//! state of every entry is gathered into a [`PromotionPlan`], the plan is
//! handed to the [`PromotionValidator`], and finally the writes and deletes are
//! consolidated into the store. Each consolidated write is conditional on the
//! digest observed while gathering, so a record changed in between surfaces as
//! a [`StoreError::Conflict`](crate::store::StoreError::Conflict) instead of
//! being silently overwritten. Consolidation is not transactional across
//! records: entries written before a conflict stay written.

mod error;
mod locks;
mod types;
mod validator;

pub use error::PromotionError;
pub use locks::{PromotionGuard, PromotionLocks};
pub use types::{
    ChangeCounts, PlannedDelete, PlannedWrite, PromotionPlan, PromotionPreview, PromotionReport,
    PromotionRequest,
};
pub use validator::{NoopValidator, PromotionValidator};

use std::collections::HashSet;

use chrono::Utc;
use content_core::{ResourceType, Space};
use tracing::{debug, info, warn};

use crate::diff::{diff, diff_singleton, Change, ChangeOperation, SingletonSide};
use crate::store::{ContentStore, Precondition};

pub struct PromotionService<S> {
    store: S,
    locks: PromotionLocks,
    validator: Box<dyn PromotionValidator>,
}

impl<S: ContentStore> PromotionService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: PromotionLocks::new(),
            validator: Box::new(NoopValidator),
        }
    }

    pub fn with_validator(mut self, validator: impl PromotionValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// Share a lock table with other services over the same store.
    pub fn with_locks(mut self, locks: PromotionLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn locks(&self) -> &PromotionLocks {
        &self.locks
    }

    /// Changes that promoting `space` would apply to the next space.
    ///
    /// Every resource type appears in the result, with an empty list when
    /// nothing differs.
    pub fn preview(&self, space: Space) -> Result<PromotionPreview, PromotionError> {
        let target = space.next_space()?;
        let mut preview = PromotionPreview {
            space,
            target,
            changes: Default::default(),
        };

        for resource_type in ResourceType::ALL {
            let changes = if resource_type.is_singleton() {
                let source_doc = self.store.get_singleton(resource_type, space)?;
                let target_doc = self.store.get_singleton(resource_type, target)?;
                diff_singleton(
                    resource_type,
                    SingletonSide {
                        space,
                        document: source_doc.as_ref().map(|r| &r.document),
                    },
                    SingletonSide {
                        space: target,
                        document: target_doc.as_ref().map(|r| &r.document),
                    },
                )?
            } else {
                let source_inv = self.store.list_ids_and_digests(resource_type, space)?;
                let target_inv = self.store.list_ids_and_digests(resource_type, target)?;
                diff(&source_inv, &target_inv)
            };
            debug!(%resource_type, changes = changes.len(), "diffed resource type");
            preview.changes.insert(resource_type, changes);
        }

        info!(
            space = %space,
            target = %target,
            changes = preview.len(),
            "promotion preview computed"
        );
        Ok(preview)
    }

    /// Apply `request` to the space after `request.space`.
    pub fn promote(&self, request: &PromotionRequest) -> Result<PromotionReport, PromotionError> {
        let source = request.space;
        let target = source.next_space()?;
        let _guard = self
            .locks
            .try_acquire(source, target)
            .ok_or(PromotionError::InProgress {
                from: source,
                to: target,
            })?;

        validate_request(request)?;
        let plan = self.gather(request, target)?;

        self.validator
            .validate(&plan)
            .map_err(PromotionError::Rejected)?;

        self.consolidate(&plan)?;

        let report = PromotionReport {
            space: source,
            target,
            promoted_at: Utc::now(),
            results: plan.counts(),
        };
        info!(
            space = %source,
            target = %target,
            applied = report.total_applied(),
            skipped = plan.skipped.len(),
            "promotion completed"
        );
        Ok(report)
    }

    // ── Gather ──────────────────────────────────────────────────

    fn gather(
        &self,
        request: &PromotionRequest,
        target: Space,
    ) -> Result<PromotionPlan, PromotionError> {
        let source = request.space;
        let mut plan = PromotionPlan::new(source, target);

        for (&resource_type, changes) in &request.changes {
            for change in changes {
                if resource_type.is_singleton() {
                    self.gather_singleton(&mut plan, resource_type, change)?;
                } else {
                    self.gather_entry(&mut plan, resource_type, change)?;
                }
            }
        }
        Ok(plan)
    }

    fn gather_entry(
        &self,
        plan: &mut PromotionPlan,
        resource_type: ResourceType,
        change: &Change,
    ) -> Result<(), PromotionError> {
        let (source, target) = (plan.source, plan.target);
        let id = change.id.as_str();

        match change.operation {
            ChangeOperation::Add | ChangeOperation::Update => {
                let resource = self
                    .store
                    .get(resource_type, source, id)?
                    .ok_or_else(|| PromotionError::NotFound {
                        resource_type,
                        id: id.to_string(),
                        space: source,
                    })?;
                let existing = self.store.get(resource_type, target, id)?;
                if change.operation == ChangeOperation::Add && existing.is_some() {
                    return Err(PromotionError::InvalidRequest(format!(
                        "{resource_type} [{id}] already exists in space [{target}]; use update instead"
                    )));
                }
                plan.writes.push(PlannedWrite {
                    operation: change.operation,
                    resource: resource.in_space(target),
                    precondition: Precondition::observed(existing.as_ref()),
                });
            }
            ChangeOperation::Remove => match self.store.get(resource_type, target, id)? {
                Some(existing) => plan.deletes.push(PlannedDelete {
                    resource_type,
                    id: id.to_string(),
                    precondition: Precondition::observed(Some(&existing)),
                    superseded: false,
                }),
                None => {
                    warn!(%resource_type, id, space = %target, "resource to remove is not in the target space; skipping");
                    plan.skipped.push((resource_type, id.to_string()));
                }
            },
        }
        Ok(())
    }

    /// The source singleton replaces the target one. A target record stored
    /// under another id is deleted once the new one is written.
    fn gather_singleton(
        &self,
        plan: &mut PromotionPlan,
        resource_type: ResourceType,
        change: &Change,
    ) -> Result<(), PromotionError> {
        let (source, target) = (plan.source, plan.target);
        let resource = self
            .store
            .get(resource_type, source, &change.id)?
            .ok_or_else(|| PromotionError::NotFound {
                resource_type,
                id: change.id.clone(),
                space: source,
            })?;

        let current = self.store.get_singleton(resource_type, target)?;
        let precondition = match &current {
            Some(existing) if existing.id == resource.id => Precondition::observed(Some(existing)),
            Some(existing) => {
                plan.deletes.push(PlannedDelete {
                    resource_type,
                    id: existing.id.clone(),
                    precondition: Precondition::observed(Some(existing)),
                    superseded: true,
                });
                Precondition::Absent
            }
            None => Precondition::Absent,
        };

        plan.writes.push(PlannedWrite {
            operation: ChangeOperation::Update,
            resource: resource.in_space(target),
            precondition,
        });
        Ok(())
    }

    // ── Consolidate ─────────────────────────────────────────────

    fn consolidate(&self, plan: &PromotionPlan) -> Result<(), PromotionError> {
        for write in &plan.writes {
            self.store
                .put_if(&write.resource, write.precondition.clone())?;
            debug!(
                resource_type = %write.resource.resource_type,
                id = %write.resource.id,
                operation = %write.operation,
                "promoted resource"
            );
        }
        for delete in &plan.deletes {
            let removed = self.store.delete_if(
                delete.resource_type,
                plan.target,
                &delete.id,
                delete.precondition.clone(),
            )?;
            debug!(resource_type = %delete.resource_type, id = %delete.id, removed, "removed resource");
        }
        Ok(())
    }
}

/// Structural checks that need no store access.
fn validate_request(request: &PromotionRequest) -> Result<(), PromotionError> {
    for (resource_type, changes) in &request.changes {
        if resource_type.is_singleton() {
            if let Some(bad) = changes
                .iter()
                .find(|c| c.operation != ChangeOperation::Update)
            {
                return Err(PromotionError::InvalidRequest(format!(
                    "only update is allowed for {resource_type}, got {}",
                    bad.operation
                )));
            }
            if changes.len() > 1 {
                return Err(PromotionError::InvalidRequest(format!(
                    "at most one {resource_type} change is allowed"
                )));
            }
        }

        let mut seen = HashSet::new();
        for change in changes {
            if !seen.insert(change.id.as_str()) {
                return Err(PromotionError::InvalidRequest(format!(
                    "duplicate change for {resource_type} [{}]",
                    change.id
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
