//! Tests for promotion preview and execution over the in-memory store.

use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::diff::DiffError;
use crate::resource::Resource;
use crate::store::{MemoryStore, StoreError};
use content_core::CoreError;

fn resource(resource_type: ResourceType, space: Space, doc: serde_json::Value) -> Resource {
    Resource::new(resource_type, space, doc).unwrap()
}

/// Draft and test spaces with one policy each plus a few decoders.
fn seeded() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let put = |r: Resource| store.put(&r).unwrap();

    put(resource(ResourceType::Policy, Space::Draft, json!({"id": "p-draft", "title": "policy"})));
    put(resource(ResourceType::Policy, Space::Test, json!({"id": "p-test", "title": "policy"})));

    put(resource(ResourceType::Decoders, Space::Draft, json!({"id": "d1", "v": 1})));
    put(resource(ResourceType::Decoders, Space::Draft, json!({"id": "d2", "v": 2})));
    put(resource(ResourceType::Decoders, Space::Draft, json!({"id": "d3", "v": 3})));
    put(resource(ResourceType::Decoders, Space::Test, json!({"id": "d1", "v": 1})));
    put(resource(ResourceType::Decoders, Space::Test, json!({"id": "d2", "v": 0})));
    put(resource(ResourceType::Decoders, Space::Test, json!({"id": "d4", "v": 4})));
    store
}

fn request(space: Space, changes: serde_json::Value) -> PromotionRequest {
    serde_json::from_value(json!({"space": space, "changes": changes})).unwrap()
}

#[test]
fn preview_lists_changes_per_type() {
    let service = PromotionService::new(seeded());
    let preview = service.preview(Space::Draft).unwrap();

    assert_eq!(preview.target, Space::Test);
    assert_eq!(
        preview.changes[&ResourceType::Decoders],
        vec![Change::update("d2"), Change::add("d3"), Change::remove("d4")]
    );
    assert!(preview.changes[&ResourceType::Policy].is_empty());
    assert_eq!(preview.changes.len(), ResourceType::ALL.len());
    assert_eq!(preview.len(), 3);
}

#[test]
fn preview_wire_shape() {
    let service = PromotionService::new(seeded());
    let v = serde_json::to_value(service.preview(Space::Draft).unwrap()).unwrap();
    assert_eq!(v["space"], "draft");
    assert_eq!(v["target"], "test");
    assert_eq!(v["changes"]["decoders"][0], json!({"operation": "update", "id": "d2"}));
    assert_eq!(v["changes"]["rules"], json!([]));
}

#[test]
fn preview_detects_policy_content_change() {
    let store = seeded();
    store
        .put(&resource(
            ResourceType::Policy,
            Space::Draft,
            json!({"id": "p-draft", "title": "renamed"}),
        ))
        .unwrap();
    let preview = PromotionService::new(store).preview(Space::Draft).unwrap();
    assert_eq!(preview.changes[&ResourceType::Policy], vec![Change::update("p-draft")]);
}

#[test]
fn preview_from_standard_fails() {
    let service = PromotionService::new(seeded());
    assert!(matches!(
        service.preview(Space::Standard),
        Err(PromotionError::Core(CoreError::NoFurtherPromotion(Space::Standard)))
    ));
}

#[test]
fn preview_without_target_policy_fails() {
    let service = PromotionService::new(seeded());
    assert!(matches!(
        service.preview(Space::Test),
        Err(PromotionError::Diff(DiffError::MissingSingleton {
            space: Space::Standard,
            ..
        }))
    ));
}

#[test]
fn promoting_the_preview_converges() {
    let store = seeded();
    store
        .put(&resource(
            ResourceType::Policy,
            Space::Draft,
            json!({"id": "p-draft", "title": "v2"}),
        ))
        .unwrap();
    let service = PromotionService::new(Arc::clone(&store));

    let preview = service.preview(Space::Draft).unwrap();
    let report = service.promote(&preview.into_request()).unwrap();

    let decoders = report.results[&ResourceType::Decoders];
    assert_eq!((decoders.added, decoders.updated, decoders.removed), (1, 1, 1));
    assert_eq!(report.results[&ResourceType::Policy].updated, 1);
    assert_eq!(report.total_applied(), 4);

    assert!(service.preview(Space::Draft).unwrap().is_empty());
    let promoted = store
        .get(ResourceType::Decoders, Space::Test, "d3")
        .unwrap()
        .unwrap();
    assert_eq!(promoted.space, Space::Test);
    assert!(promoted.verify_digest());

    // Draft content is untouched by promotion.
    assert!(store
        .get(ResourceType::Decoders, Space::Draft, "d3")
        .unwrap()
        .is_some());
}

#[test]
fn policy_replaces_target_policy_under_new_id() {
    let store = seeded();
    store
        .put(&resource(
            ResourceType::Policy,
            Space::Draft,
            json!({"id": "p-draft", "title": "v2"}),
        ))
        .unwrap();
    let service = PromotionService::new(Arc::clone(&store));
    service
        .promote(&request(Space::Draft, json!({"policy": [{"operation": "update", "id": "p-draft"}]})))
        .unwrap();

    let policies = store
        .list_ids_and_digests(ResourceType::Policy, Space::Test)
        .unwrap();
    assert_eq!(policies.keys().collect::<Vec<_>>(), vec!["p-draft"]);
    let policy = store
        .get_singleton(ResourceType::Policy, Space::Test)
        .unwrap()
        .unwrap();
    assert_eq!(policy.document["title"], "v2");
}

#[test]
fn policy_accepts_only_update() {
    let service = PromotionService::new(seeded());
    for op in ["add", "remove", "delete"] {
        let err = service
            .promote(&request(Space::Draft, json!({"policy": [{"operation": op, "id": "p-draft"}]})))
            .unwrap_err();
        assert!(matches!(err, PromotionError::InvalidRequest(_)), "{op}: {err}");
    }
}

#[test]
fn duplicate_entries_are_rejected() {
    let service = PromotionService::new(seeded());
    let err = service
        .promote(&request(
            Space::Draft,
            json!({"decoders": [
                {"operation": "add", "id": "d3"},
                {"operation": "update", "id": "d3"}
            ]}),
        ))
        .unwrap_err();
    assert!(matches!(err, PromotionError::InvalidRequest(ref m) if m.contains("d3")));
}

#[test]
fn add_requires_absent_target() {
    let store = seeded();
    let service = PromotionService::new(Arc::clone(&store));
    let err = service
        .promote(&request(Space::Draft, json!({"decoders": [{"operation": "add", "id": "d2"}]})))
        .unwrap_err();
    assert!(matches!(err, PromotionError::InvalidRequest(_)));

    // Nothing was written.
    let d2 = store.get(ResourceType::Decoders, Space::Test, "d2").unwrap().unwrap();
    assert_eq!(d2.document["v"], 0);
}

#[test]
fn add_and_update_require_source() {
    let service = PromotionService::new(seeded());
    for op in ["add", "update"] {
        let err = service
            .promote(&request(Space::Draft, json!({"decoders": [{"operation": op, "id": "ghost"}]})))
            .unwrap_err();
        assert!(matches!(
            err,
            PromotionError::NotFound { space: Space::Draft, ref id, .. } if id == "ghost"
        ));
    }
}

#[test]
fn update_creates_missing_target_record() {
    let store = seeded();
    let service = PromotionService::new(Arc::clone(&store));
    let report = service
        .promote(&request(Space::Draft, json!({"decoders": [{"operation": "update", "id": "d3"}]})))
        .unwrap();
    assert_eq!(report.results[&ResourceType::Decoders].updated, 1);
    assert!(store.get(ResourceType::Decoders, Space::Test, "d3").unwrap().is_some());
}

#[test]
fn remove_of_missing_target_is_skipped() {
    let service = PromotionService::new(seeded());
    let report = service
        .promote(&request(
            Space::Draft,
            json!({"decoders": [
                {"operation": "remove", "id": "d4"},
                {"operation": "delete", "id": "gone"}
            ]}),
        ))
        .unwrap();
    let counts = report.results[&ResourceType::Decoders];
    assert_eq!(counts.removed, 1);
    assert_eq!(counts.skipped, 1);
}

#[test]
fn concurrent_promotion_of_same_pair_is_refused() {
    let service = PromotionService::new(seeded());
    let _held = service.locks().try_acquire(Space::Draft, Space::Test).unwrap();
    let err = service
        .promote(&request(Space::Draft, json!({})))
        .unwrap_err();
    assert!(matches!(
        err,
        PromotionError::InProgress {
            from: Space::Draft,
            to: Space::Test
        }
    ));
}

#[test]
fn lock_is_released_after_failure() {
    let service = PromotionService::new(seeded());
    let bad = request(Space::Draft, json!({"decoders": [{"operation": "add", "id": "ghost"}]}));
    assert!(service.promote(&bad).is_err());
    assert!(!service.locks().is_held(Space::Draft, Space::Test));
}

#[test]
fn validator_rejection_writes_nothing() {
    let store = seeded();
    let service = PromotionService::new(Arc::clone(&store)).with_validator(
        |plan: &PromotionPlan| -> Result<(), String> {
            if plan.resources_of(ResourceType::Decoders).any(|r| r.id == "d3") {
                Err("decoder d3 fails engine validation".into())
            } else {
                Ok(())
            }
        },
    );

    let err = service
        .promote(&request(
            Space::Draft,
            json!({"decoders": [{"operation": "add", "id": "d3"}, {"operation": "remove", "id": "d4"}]}),
        ))
        .unwrap_err();
    assert!(matches!(err, PromotionError::Rejected(ref m) if m.contains("d3")));
    assert!(store.get(ResourceType::Decoders, Space::Test, "d3").unwrap().is_none());
    assert!(store.get(ResourceType::Decoders, Space::Test, "d4").unwrap().is_some());
}

#[test]
fn concurrent_write_surfaces_as_conflict() {
    let store = seeded();
    let intruder = Arc::clone(&store);
    // Runs between gather and consolidate, like a racing writer would.
    let service = PromotionService::new(Arc::clone(&store)).with_validator(
        move |_plan: &PromotionPlan| -> Result<(), String> {
            let r = Resource::new(ResourceType::Decoders, Space::Test, json!({"id": "d2", "v": 99}))
                .map_err(|e| e.to_string())?;
            intruder.put(&r).map_err(|e| e.to_string())
        },
    );

    let err = service
        .promote(&request(Space::Draft, json!({"decoders": [{"operation": "update", "id": "d2"}]})))
        .unwrap_err();
    assert!(matches!(
        err,
        PromotionError::Store(StoreError::Conflict { ref id, .. }) if id == "d2"
    ));
    let d2 = store.get(ResourceType::Decoders, Space::Test, "d2").unwrap().unwrap();
    assert_eq!(d2.document["v"], 99);
}

#[test]
fn request_accepts_delete_alias_and_missing_changes() {
    let req: PromotionRequest = serde_json::from_value(json!({"space": "test"})).unwrap();
    assert!(req.changes.is_empty());

    let req = request(Space::Draft, json!({"kvdbs": [{"operation": "delete", "id": "k"}]}));
    assert_eq!(req.changes[&ResourceType::Kvdbs], vec![Change::remove("k")]);

    let bad: Result<PromotionRequest, _> = serde_json::from_value(json!({"space": "prod"}));
    assert!(bad.is_err());
}

#[test]
fn report_serializes_rfc3339_timestamp() {
    let service = PromotionService::new(seeded());
    let report = service.promote(&request(Space::Draft, json!({}))).unwrap();
    let v = serde_json::to_value(&report).unwrap();
    let ts = v["promoted_at"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    assert_eq!(report.total_applied(), 0);
}
