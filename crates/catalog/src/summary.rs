use std::collections::BTreeMap;

use content_core::{ResourceType, Space};
use serde::{Deserialize, Serialize};

use crate::hash::aggregate_digest;
use crate::store::{ContentStore, StoreError};

/// Aggregate digest of everything stored in `space`.
///
/// The policy digest comes first, then every other type in
/// [`ResourceType::ALL`] order with ids ascending. A space without a policy
/// simply contributes nothing for it.
pub fn space_digest<S: ContentStore + ?Sized>(store: &S, space: Space) -> Result<String, StoreError> {
    Ok(SpaceSummary::collect(store, space)?.digest)
}

/// Per-space record counts plus the space digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceSummary {
    pub space: Space,
    pub digest: String,
    pub counts: BTreeMap<ResourceType, usize>,
}

impl SpaceSummary {
    pub fn collect<S: ContentStore + ?Sized>(store: &S, space: Space) -> Result<Self, StoreError> {
        let mut digests = Vec::new();
        let mut counts = BTreeMap::new();

        for resource_type in ResourceType::ALL {
            if resource_type.is_singleton() {
                let singleton = store.get_singleton(resource_type, space)?;
                counts.insert(resource_type, usize::from(singleton.is_some()));
                digests.extend(singleton.map(|r| r.digest));
            } else {
                let inventory = store.list_ids_and_digests(resource_type, space)?;
                counts.insert(resource_type, inventory.len());
                digests.extend(inventory.into_values());
            }
        }

        Ok(Self {
            space,
            digest: aggregate_digest(digests.iter().map(String::as_str)),
            counts,
        })
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}
