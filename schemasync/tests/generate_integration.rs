//! Integration tests for capturing the live schema.

mod common;

use serde_json::json;

use common::FakeCms;
use schemasync::keys::pk_of;
use schemasync::{MigrationPlan, SchemaCollection, SnapshotStore, capture_snapshot};

fn live_cms() -> FakeCms {
    FakeCms::new()
        .with_list(
            SchemaCollection::Collections,
            json!([
                {"collection": "directus_files", "meta": {"system": true}},
                {"collection": "posts", "meta": {"icon": "article"}}
            ]),
        )
        .with_list(
            SchemaCollection::Roles,
            json!([
                {"id": 1, "name": "Admin", "users": [1]},
                {"id": 2, "name": "Editor", "users": [4, 5]}
            ]),
        )
        .with_list(
            SchemaCollection::Permissions,
            json!([
                {"id": null, "role": null, "collection": "directus_users", "action": "read"},
                {"id": 11, "role": 2, "collection": "posts", "action": "read"}
            ]),
        )
        .with_list(
            SchemaCollection::Fields,
            json!([
                {"collection": "directus_users", "field": "email", "meta": {"system": true}},
                {"collection": "posts", "field": "id", "meta": null},
                {"collection": "posts", "field": "title", "type": "string", "meta": {"interface": "input"}}
            ]),
        )
        .with_list(
            SchemaCollection::Relations,
            json!([
                {"id": 1, "many_collection": "directus_users", "system": true},
                {"id": 9, "many_collection": "posts", "many_field": "author"}
            ]),
        )
}

#[tokio::test]
async fn capture_keeps_only_user_managed_records() {
    let snapshot = capture_snapshot(&live_cms()).await.unwrap();

    let keys = |collection| {
        snapshot
            .records(collection)
            .iter()
            .filter_map(pk_of)
            .collect::<Vec<_>>()
    };
    assert_eq!(keys(SchemaCollection::Collections), vec!["posts"]);
    assert_eq!(keys(SchemaCollection::Roles), vec!["2"]);
    assert_eq!(keys(SchemaCollection::Permissions), vec!["11"]);
    assert_eq!(keys(SchemaCollection::Fields), vec!["posts/title"]);
    assert_eq!(keys(SchemaCollection::Relations), vec!["9"]);
    assert_eq!(snapshot.roles[0]["users"], json!([]));
}

#[tokio::test]
async fn saved_snapshot_diffs_clean_against_itself() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(dir.path());

    let snapshot = capture_snapshot(&live_cms()).await.unwrap();
    store.save_current(&snapshot).unwrap();

    let text = std::fs::read_to_string(store.current_path()).unwrap();
    assert!(!text.contains("\"pk\""));

    // A freshly generated snapshot used as the target plans nothing
    std::fs::copy(store.current_path(), store.target_path()).unwrap();
    let plan = MigrationPlan::build(&store.load_current().unwrap(), &store.load_target().unwrap()).unwrap();
    assert!(!plan.has_changes());
    assert!(plan.collections.iter().all(|p| p.is_unchanged()));
}

#[tokio::test]
async fn duplicate_keys_abort_capture() {
    let cms = FakeCms::new().with_list(
        SchemaCollection::Collections,
        json!([{"collection": "posts"}, {"collection": "posts"}]),
    );

    let err = capture_snapshot(&cms).await.unwrap_err();
    assert!(matches!(err, schemasync::SyncError::DuplicateKey { .. }));
}
