mod error;
mod file;
mod memory;

pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;

use std::fmt;
use std::sync::Arc;

use content_core::{ResourceType, Space};

use crate::diff::Inventory;
use crate::resource::Resource;

/// What a conditional write expects to find in the store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Precondition {
    /// Unconditional write.
    #[default]
    Any,
    /// No record may exist yet.
    Absent,
    /// The record must exist with exactly this digest.
    Digest(String),
}

impl Precondition {
    /// Expect whatever `current` is now: its digest, or absence.
    pub fn observed(current: Option<&Resource>) -> Self {
        match current {
            Some(r) => Precondition::Digest(r.digest.clone()),
            None => Precondition::Absent,
        }
    }

    /// Check against the digest currently stored. Implementations call this
    /// while holding their write lock.
    pub fn check(
        &self,
        resource_type: ResourceType,
        id: &str,
        current: Option<&str>,
    ) -> Result<(), StoreError> {
        let ok = match (self, current) {
            (Precondition::Any, _) => true,
            (Precondition::Absent, None) => true,
            (Precondition::Digest(expected), Some(actual)) => expected == actual,
            _ => false,
        };
        if ok {
            return Ok(());
        }
        Err(StoreError::Conflict {
            resource_type,
            id: id.to_string(),
            expected: self.to_string(),
            actual: current.unwrap_or("absent").to_string(),
        })
    }
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precondition::Any => f.write_str("any"),
            Precondition::Absent => f.write_str("absent"),
            Precondition::Digest(d) => f.write_str(d),
        }
    }
}

/// Persistence for resources, addressed by `(resource type, space, id)`.
///
/// `put_if` and `delete_if` must evaluate their precondition atomically with
/// the write; that is what lets workflows detect concurrent modification.
pub trait ContentStore: Send + Sync {
    fn get(
        &self,
        resource_type: ResourceType,
        space: Space,
        id: &str,
    ) -> Result<Option<Resource>, StoreError>;

    fn put_if(&self, resource: &Resource, precondition: Precondition) -> Result<(), StoreError>;

    /// Returns whether a record was removed.
    fn delete_if(
        &self,
        resource_type: ResourceType,
        space: Space,
        id: &str,
        precondition: Precondition,
    ) -> Result<bool, StoreError>;

    fn list_ids_and_digests(
        &self,
        resource_type: ResourceType,
        space: Space,
    ) -> Result<Inventory, StoreError>;

    fn put(&self, resource: &Resource) -> Result<(), StoreError> {
        self.put_if(resource, Precondition::Any)
    }

    fn delete(
        &self,
        resource_type: ResourceType,
        space: Space,
        id: &str,
    ) -> Result<bool, StoreError> {
        self.delete_if(resource_type, space, id, Precondition::Any)
    }

    /// The single record of a singleton type in `space`, if any.
    ///
    /// Should more than one exist, the lowest id wins.
    fn get_singleton(
        &self,
        resource_type: ResourceType,
        space: Space,
    ) -> Result<Option<Resource>, StoreError> {
        let inventory = self.list_ids_and_digests(resource_type, space)?;
        match inventory.keys().next() {
            Some(id) => self.get(resource_type, space, id),
            None => Ok(None),
        }
    }
}

impl<S: ContentStore + ?Sized> ContentStore for Arc<S> {
    fn get(
        &self,
        resource_type: ResourceType,
        space: Space,
        id: &str,
    ) -> Result<Option<Resource>, StoreError> {
        (**self).get(resource_type, space, id)
    }

    fn put_if(&self, resource: &Resource, precondition: Precondition) -> Result<(), StoreError> {
        (**self).put_if(resource, precondition)
    }

    fn delete_if(
        &self,
        resource_type: ResourceType,
        space: Space,
        id: &str,
        precondition: Precondition,
    ) -> Result<bool, StoreError> {
        (**self).delete_if(resource_type, space, id, precondition)
    }

    fn list_ids_and_digests(
        &self,
        resource_type: ResourceType,
        space: Space,
    ) -> Result<Inventory, StoreError> {
        (**self).list_ids_and_digests(resource_type, space)
    }

    fn get_singleton(
        &self,
        resource_type: ResourceType,
        space: Space,
    ) -> Result<Option<Resource>, StoreError> {
        (**self).get_singleton(resource_type, space)
    }
}
