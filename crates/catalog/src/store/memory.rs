use std::collections::HashMap;
use std::sync::RwLock;

use content_core::{ResourceType, Space};

use super::{ContentStore, Precondition, StoreError};
use crate::diff::Inventory;
use crate::resource::Resource;

type Bucket = std::collections::BTreeMap<String, Resource>;

/// In-process store, one map per `(type, space)`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: RwLock<HashMap<(ResourceType, Space), Bucket>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records across all types and spaces.
    pub fn len(&self) -> usize {
        let buckets = self.buckets.read().expect("memory store lock poisoned");
        buckets.values().map(Bucket::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContentStore for MemoryStore {
    fn get(
        &self,
        resource_type: ResourceType,
        space: Space,
        id: &str,
    ) -> Result<Option<Resource>, StoreError> {
        let buckets = self.buckets.read().expect("memory store lock poisoned");
        Ok(buckets
            .get(&(resource_type, space))
            .and_then(|bucket| bucket.get(id))
            .cloned())
    }

    fn put_if(&self, resource: &Resource, precondition: Precondition) -> Result<(), StoreError> {
        let mut buckets = self.buckets.write().expect("memory store lock poisoned");
        let bucket = buckets
            .entry((resource.resource_type, resource.space))
            .or_default();
        let current = bucket.get(&resource.id).map(|r| r.digest.as_str());
        precondition.check(resource.resource_type, &resource.id, current)?;
        bucket.insert(resource.id.clone(), resource.clone());
        Ok(())
    }

    fn delete_if(
        &self,
        resource_type: ResourceType,
        space: Space,
        id: &str,
        precondition: Precondition,
    ) -> Result<bool, StoreError> {
        let mut buckets = self.buckets.write().expect("memory store lock poisoned");
        let Some(bucket) = buckets.get_mut(&(resource_type, space)) else {
            precondition.check(resource_type, id, None)?;
            return Ok(false);
        };
        let current = bucket.get(id).map(|r| r.digest.as_str());
        precondition.check(resource_type, id, current)?;
        Ok(bucket.remove(id).is_some())
    }

    fn list_ids_and_digests(
        &self,
        resource_type: ResourceType,
        space: Space,
    ) -> Result<Inventory, StoreError> {
        let buckets = self.buckets.read().expect("memory store lock poisoned");
        Ok(buckets
            .get(&(resource_type, space))
            .map(|bucket| {
                bucket
                    .iter()
                    .map(|(id, r)| (id.clone(), r.digest.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}
