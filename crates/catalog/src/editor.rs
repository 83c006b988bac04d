use content_core::document::{DocumentTree, ID_KEY};
use content_core::{ResourceType, Space};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::patch::{self, PatchFailure, PatchOperation};
use crate::resource::{Resource, ResourceError};
use crate::store::{ContentStore, Precondition, StoreError};

#[derive(Debug, Error)]
pub enum EditError {
    #[error("{resource_type} [{id}] not found in space [{space}]")]
    NotFound {
        resource_type: ResourceType,
        id: String,
        space: Space,
    },
    #[error("{resource_type} [{id}] already exists in space [{space}]")]
    AlreadyExists {
        resource_type: ResourceType,
        id: String,
        space: Space,
    },
    #[error("space [{0}] does not accept direct edits")]
    NotEditable(Space),
    #[error("patch may not change the resource id ({expected} -> {found})")]
    IdChanged { expected: String, found: String },
    #[error(transparent)]
    Patch(#[from] PatchFailure),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// Create, patch and delete resources in an editable space.
pub struct ResourceEditor<S> {
    store: S,
    space: Space,
}

impl<S: ContentStore> ResourceEditor<S> {
    /// Editor over the draft space.
    pub fn new(store: S) -> Self {
        Self {
            store,
            space: Space::Draft,
        }
    }

    /// Editor over `space`, which must accept direct edits.
    pub fn for_space(store: S, space: Space) -> Result<Self, EditError> {
        if !space.is_editable() {
            return Err(EditError::NotEditable(space));
        }
        Ok(Self { store, space })
    }

    pub fn space(&self) -> Space {
        self.space
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn get(&self, resource_type: ResourceType, id: &str) -> Result<Resource, EditError> {
        self.store
            .get(resource_type, self.space, id)?
            .ok_or_else(|| self.not_found(resource_type, id))
    }

    /// Store a new resource. A document without an `id` gets a fresh UUID.
    pub fn create(
        &self,
        resource_type: ResourceType,
        mut document: DocumentTree,
    ) -> Result<Resource, EditError> {
        let Value::Object(map) = &mut document else {
            return Err(ResourceError::NotAnObject.into());
        };
        if map.get(ID_KEY).map_or(true, Value::is_null) {
            map.insert(ID_KEY.to_string(), Value::String(uuid::Uuid::new_v4().to_string()));
        }
        let resource = Resource::new(resource_type, self.space, document)?;

        if resource_type.is_singleton() {
            if let Some(existing) = self.store.get_singleton(resource_type, self.space)? {
                return Err(EditError::AlreadyExists {
                    resource_type,
                    id: existing.id,
                    space: self.space,
                });
            }
        } else if self.store.get(resource_type, self.space, &resource.id)?.is_some() {
            return Err(EditError::AlreadyExists {
                resource_type,
                id: resource.id,
                space: self.space,
            });
        }

        self.store.put_if(&resource, Precondition::Absent)?;
        if resource_type.is_singleton() {
            self.settle_singleton(&resource)?;
        }
        info!(%resource_type, id = %resource.id, space = %self.space, "resource created");
        Ok(resource)
    }

    /// Apply `ops` to a stored resource.
    ///
    /// The operations run against a working copy, so the stored document is
    /// untouched when any of them fails. The write is conditional on the
    /// digest read at the start.
    pub fn patch(
        &self,
        resource_type: ResourceType,
        id: &str,
        ops: &[PatchOperation],
    ) -> Result<Resource, EditError> {
        let current = self.get(resource_type, id)?;
        let mut working = current.document.clone();
        patch::apply(&mut working, ops)?;

        let patched = current.with_document(working).map_err(|e| match e {
            ResourceError::MissingId => EditError::IdChanged {
                expected: current.id.clone(),
                found: String::new(),
            },
            other => other.into(),
        })?;
        if patched.id != current.id {
            warn!(%resource_type, id, new_id = %patched.id, "patch tried to change the resource id");
            return Err(EditError::IdChanged {
                expected: current.id,
                found: patched.id,
            });
        }

        if patched.digest == current.digest {
            info!(%resource_type, id, "patch left the resource unchanged");
            return Ok(current);
        }
        self.store
            .put_if(&patched, Precondition::Digest(current.digest.clone()))?;
        info!(%resource_type, id, ops = ops.len(), "resource patched");
        Ok(patched)
    }

    /// Remove a resource, returning what was stored.
    pub fn delete(&self, resource_type: ResourceType, id: &str) -> Result<Resource, EditError> {
        let current = self.get(resource_type, id)?;
        let removed = self.store.delete_if(
            resource_type,
            self.space,
            id,
            Precondition::observed(Some(&current)),
        )?;
        if !removed {
            return Err(self.not_found(resource_type, id));
        }
        info!(%resource_type, id, space = %self.space, "resource deleted");
        Ok(current)
    }

    /// Another create can land a second singleton between the lookup and the
    /// write. A writer that finds a rival after its own write backs out, so
    /// at most one survives (possibly none, and then both callers see an error).
    fn settle_singleton(&self, resource: &Resource) -> Result<(), EditError> {
        let inventory = self
            .store
            .list_ids_and_digests(resource.resource_type, self.space)?;
        let Some(rival) = inventory.keys().find(|id| **id != resource.id) else {
            return Ok(());
        };
        warn!(
            resource_type = %resource.resource_type,
            id = %resource.id,
            rival = %rival,
            space = %self.space,
            "concurrent singleton create; backing out"
        );
        self.store.delete_if(
            resource.resource_type,
            self.space,
            &resource.id,
            Precondition::Digest(resource.digest.clone()),
        )?;
        Err(EditError::AlreadyExists {
            resource_type: resource.resource_type,
            id: rival.clone(),
            space: self.space,
        })
    }

    fn not_found(&self, resource_type: ResourceType, id: &str) -> EditError {
        EditError::NotFound {
            resource_type,
            id: id.to_string(),
            space: self.space,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::patch::PatchError;
    use crate::store::MemoryStore;

    fn editor() -> ResourceEditor<Arc<MemoryStore>> {
        ResourceEditor::new(Arc::new(MemoryStore::new()))
    }

    fn ops(v: Value) -> Vec<PatchOperation> {
        patch::parse_operations(&v).unwrap()
    }

    #[test]
    fn create_keeps_given_id() {
        let ed = editor();
        let r = ed
            .create(ResourceType::Rules, json!({"id": "r1", "title": "ssh brute force"}))
            .unwrap();
        assert_eq!(r.id, "r1");
        assert_eq!(r.space, Space::Draft);
        assert_eq!(ed.get(ResourceType::Rules, "r1").unwrap(), r);
    }

    #[test]
    fn create_assigns_uuid() {
        let ed = editor();
        let r = ed.create(ResourceType::Filters, json!({"title": "x"})).unwrap();
        assert!(uuid::Uuid::parse_str(&r.id).is_ok());
        assert_eq!(r.document["id"], r.id.as_str());

        let r2 = ed.create(ResourceType::Filters, json!({"id": null})).unwrap();
        assert_ne!(r.id, r2.id);
    }

    #[test]
    fn create_rejects_duplicates() {
        let ed = editor();
        ed.create(ResourceType::Kvdbs, json!({"id": "k"})).unwrap();
        assert!(matches!(
            ed.create(ResourceType::Kvdbs, json!({"id": "k"})),
            Err(EditError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn create_allows_one_policy() {
        let ed = editor();
        ed.create(ResourceType::Policy, json!({"title": "main"})).unwrap();
        assert!(matches!(
            ed.create(ResourceType::Policy, json!({"id": "other"})),
            Err(EditError::AlreadyExists { resource_type: ResourceType::Policy, .. })
        ));
    }

    /// Hides the singleton from lookups, as if a rival create landed right
    /// after the editor checked.
    struct LateSingleton(MemoryStore);

    impl ContentStore for LateSingleton {
        fn get(&self, t: ResourceType, s: Space, id: &str) -> Result<Option<Resource>, StoreError> {
            self.0.get(t, s, id)
        }
        fn get_singleton(&self, _: ResourceType, _: Space) -> Result<Option<Resource>, StoreError> {
            Ok(None)
        }
        fn put_if(&self, r: &Resource, p: Precondition) -> Result<(), StoreError> {
            self.0.put_if(r, p)
        }
        fn delete_if(
            &self,
            t: ResourceType,
            s: Space,
            id: &str,
            p: Precondition,
        ) -> Result<bool, StoreError> {
            self.0.delete_if(t, s, id, p)
        }
        fn list_ids_and_digests(
            &self,
            t: ResourceType,
            s: Space,
        ) -> Result<crate::diff::Inventory, StoreError> {
            self.0.list_ids_and_digests(t, s)
        }
    }

    #[test]
    fn racing_policy_create_backs_out() {
        let store = MemoryStore::new();
        let first = Resource::new(ResourceType::Policy, Space::Draft, json!({"id": "p1"})).unwrap();
        store.put(&first).unwrap();
        let ed = ResourceEditor::new(LateSingleton(store));

        let err = ed
            .create(ResourceType::Policy, json!({"id": "p2"}))
            .unwrap_err();
        assert!(matches!(
            err,
            EditError::AlreadyExists { ref id, .. } if id == "p1"
        ));
        let inv = ed
            .store()
            .list_ids_and_digests(ResourceType::Policy, Space::Draft)
            .unwrap();
        assert_eq!(inv.keys().collect::<Vec<_>>(), vec!["p1"]);
    }

    #[test]
    fn create_rejects_non_objects_and_bad_ids() {
        let ed = editor();
        assert!(matches!(
            ed.create(ResourceType::Rules, json!([1])),
            Err(EditError::Resource(ResourceError::NotAnObject))
        ));
        assert!(matches!(
            ed.create(ResourceType::Rules, json!({"id": 5})),
            Err(EditError::Resource(ResourceError::MissingId))
        ));
    }

    #[test]
    fn only_draft_is_editable() {
        let store = Arc::new(MemoryStore::new());
        assert!(matches!(
            ResourceEditor::for_space(Arc::clone(&store), Space::Test),
            Err(EditError::NotEditable(Space::Test))
        ));
        assert!(ResourceEditor::for_space(store, Space::Draft).is_ok());
    }

    #[test]
    fn patch_rehashes_and_persists() {
        let ed = editor();
        let before = ed
            .create(ResourceType::Decoders, json!({"id": "d1", "parents": []}))
            .unwrap();
        let after = ed
            .patch(
                ResourceType::Decoders,
                "d1",
                &ops(json!([{"op": "add", "path": "/parents/-", "value": "syslog"}])),
            )
            .unwrap();
        assert_ne!(before.digest, after.digest);
        assert!(after.verify_digest());
        assert_eq!(ed.get(ResourceType::Decoders, "d1").unwrap().document["parents"], json!(["syslog"]));
    }

    #[test]
    fn failed_patch_leaves_stored_document_alone() {
        let ed = editor();
        let before = ed
            .create(ResourceType::Decoders, json!({"id": "d1", "a": 1}))
            .unwrap();
        let err = ed
            .patch(
                ResourceType::Decoders,
                "d1",
                &ops(json!([
                    {"op": "add", "path": "/b", "value": 2},
                    {"op": "remove", "path": "/missing"}
                ])),
            )
            .unwrap_err();
        match err {
            EditError::Patch(failure) => {
                assert_eq!(failure.index, 1);
                assert!(matches!(failure.error, PatchError::PathNotFound { .. }));
            }
            other => panic!("expected patch failure, got {other:?}"),
        }
        assert_eq!(ed.get(ResourceType::Decoders, "d1").unwrap(), before);
    }

    #[test]
    fn patch_cannot_change_id() {
        let ed = editor();
        ed.create(ResourceType::Rules, json!({"id": "r1"})).unwrap();
        assert!(matches!(
            ed.patch(
                ResourceType::Rules,
                "r1",
                &ops(json!([{"op": "replace", "path": "/id", "value": "r2"}]))
            ),
            Err(EditError::IdChanged { .. })
        ));
        assert!(matches!(
            ed.patch(ResourceType::Rules, "r1", &ops(json!([{"op": "remove", "path": "/id"}]))),
            Err(EditError::IdChanged { .. })
        ));
        assert!(ed.get(ResourceType::Rules, "r1").is_ok());
    }

    #[test]
    fn patch_of_missing_resource() {
        assert!(matches!(
            editor().patch(ResourceType::Rules, "nope", &[]),
            Err(EditError::NotFound { .. })
        ));
    }

    #[test]
    fn noop_patch_returns_current() {
        let ed = editor();
        let r = ed.create(ResourceType::Rules, json!({"id": "r1", "x": 1})).unwrap();
        let same = ed
            .patch(
                ResourceType::Rules,
                "r1",
                &ops(json!([{"op": "test", "path": "/x", "value": 1}])),
            )
            .unwrap();
        assert_eq!(same, r);
    }

    #[test]
    fn delete_returns_removed_resource() {
        let ed = editor();
        let r = ed.create(ResourceType::Integrations, json!({"id": "i1"})).unwrap();
        assert_eq!(ed.delete(ResourceType::Integrations, "i1").unwrap(), r);
        assert!(matches!(
            ed.delete(ResourceType::Integrations, "i1"),
            Err(EditError::NotFound { .. })
        ));
    }
}
