use content_core::document::{document_id, DocumentTree};
use content_core::{ResourceType, Space};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hash::content_digest;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("resource document must be a JSON object")]
    NotAnObject,
    #[error("resource document has no string `id` field")]
    MissingId,
}

/// One resource as held in one space.
///
/// `digest` always describes `document`: constructors compute it, and
/// [`Resource::with_document`] recomputes it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub resource_type: ResourceType,
    pub id: String,
    pub space: Space,
    pub digest: String,
    pub document: DocumentTree,
}

impl Resource {
    /// Build a resource from its document, taking the id from `document.id`.
    pub fn new(
        resource_type: ResourceType,
        space: Space,
        document: DocumentTree,
    ) -> Result<Self, ResourceError> {
        if !document.is_object() {
            return Err(ResourceError::NotAnObject);
        }
        let id = document_id(&document)
            .ok_or(ResourceError::MissingId)?
            .to_string();
        let digest = content_digest(&document);
        Ok(Self {
            resource_type,
            id,
            space,
            digest,
            document,
        })
    }

    /// Same resource with new content; the digest is recomputed.
    pub fn with_document(&self, document: DocumentTree) -> Result<Self, ResourceError> {
        Self::new(self.resource_type, self.space, document)
    }

    /// Copy of this resource placed in another space (the promoted copy).
    pub fn in_space(&self, space: Space) -> Self {
        Self {
            space,
            ..self.clone()
        }
    }

    /// Whether the stored digest still matches the document content.
    pub fn verify_digest(&self) -> bool {
        self.digest == content_digest(&self.document)
    }

    pub fn to_record(&self) -> ResourceRecord {
        ResourceRecord {
            document: self.document.clone(),
            space: SpaceRef { name: self.space },
            hash: HashRef {
                sha256: self.digest.clone(),
            },
        }
    }

    /// Rebuild from a persisted record. The stored digest is kept as-is;
    /// an empty one is recomputed.
    pub fn from_record(
        resource_type: ResourceType,
        record: ResourceRecord,
    ) -> Result<Self, ResourceError> {
        if !record.document.is_object() {
            return Err(ResourceError::NotAnObject);
        }
        let id = document_id(&record.document)
            .ok_or(ResourceError::MissingId)?
            .to_string();
        let digest = if record.hash.sha256.is_empty() {
            content_digest(&record.document)
        } else {
            record.hash.sha256
        };
        Ok(Self {
            resource_type,
            id,
            space: record.space.name,
            digest,
            document: record.document,
        })
    }
}

/// Persisted wire shape of a resource:
///
/// ```json
/// { "document": { ... }, "space": { "name": "draft" }, "hash": { "sha256": "<hex>" } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub document: DocumentTree,
    pub space: SpaceRef,
    #[serde(default)]
    pub hash: HashRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceRef {
    pub name: Space,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HashRef {
    #[serde(default)]
    pub sha256: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_takes_id_and_hashes() {
        let r = Resource::new(
            ResourceType::Decoders,
            Space::Draft,
            json!({"id": "d1", "name": "syslog"}),
        )
        .unwrap();
        assert_eq!(r.id, "d1");
        assert_eq!(r.digest, content_digest(&r.document));
        assert!(r.verify_digest());
    }

    #[test]
    fn new_rejects_bad_documents() {
        assert_eq!(
            Resource::new(ResourceType::Rules, Space::Draft, json!({"title": "x"})),
            Err(ResourceError::MissingId)
        );
        assert_eq!(
            Resource::new(ResourceType::Rules, Space::Draft, json!(["id"])),
            Err(ResourceError::NotAnObject)
        );
    }

    #[test]
    fn with_document_rehashes() {
        let r = Resource::new(ResourceType::Kvdbs, Space::Draft, json!({"id": "k", "v": 1})).unwrap();
        let r2 = r.with_document(json!({"id": "k", "v": 2})).unwrap();
        assert_ne!(r.digest, r2.digest);
        assert_eq!(r2.space, Space::Draft);
    }

    #[test]
    fn in_space_keeps_content() {
        let r = Resource::new(ResourceType::Kvdbs, Space::Draft, json!({"id": "k"})).unwrap();
        let promoted = r.in_space(Space::Test);
        assert_eq!(promoted.space, Space::Test);
        assert_eq!(promoted.digest, r.digest);
    }

    #[test]
    fn record_wire_shape() {
        let r = Resource::new(ResourceType::Policy, Space::Test, json!({"id": "p1"})).unwrap();
        let v = serde_json::to_value(r.to_record()).unwrap();
        assert_eq!(v["space"]["name"], "test");
        assert_eq!(v["document"]["id"], "p1");
        assert_eq!(v["hash"]["sha256"].as_str().unwrap().len(), 64);

        let record: ResourceRecord = serde_json::from_value(v).unwrap();
        let back = Resource::from_record(ResourceType::Policy, record).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn from_record_recomputes_missing_hash() {
        let record: ResourceRecord = serde_json::from_value(json!({
            "document": {"id": "x", "a": 1},
            "space": {"name": "draft"}
        }))
        .unwrap();
        let r = Resource::from_record(ResourceType::Filters, record).unwrap();
        assert!(r.verify_digest());
    }
}
