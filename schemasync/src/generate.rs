//! Capturing the live schema as a snapshot.

use serde_json::Value;

use crate::client::SchemaApi;
use crate::differ::diff_records;
use crate::errors::Result;
use crate::keys::with_pk;
use crate::types::{Record, SchemaCollection, Snapshot, str_prop};

/// Prefix of collections the CMS manages itself.
const SYSTEM_COLLECTION_PREFIX: &str = "directus";

/// Role that exists on every instance and is never migrated.
const ADMIN_ROLE: &str = "Admin";

/// Whether `record` belongs in a snapshot, or is created by the CMS itself.
pub fn is_user_managed(collection: SchemaCollection, record: &Record) -> bool {
    match collection {
        SchemaCollection::Collections => str_prop(record, "collection")
            .is_some_and(|name| !name.starts_with(SYSTEM_COLLECTION_PREFIX)),
        SchemaCollection::Fields => match record.get("meta") {
            Some(Value::Object(meta)) => meta.get("system") != Some(&Value::Bool(true)),
            _ => false,
        },
        SchemaCollection::Roles => str_prop(record, "name") != Some(ADMIN_ROLE),
        SchemaCollection::Permissions => record.get("id").is_some_and(|id| !id.is_null()),
        SchemaCollection::Relations => record.get("system") != Some(&Value::Bool(true)),
    }
}

/// Filter and key the records the CMS returned for one collection.
pub fn prepare_records(collection: SchemaCollection, records: Vec<Record>) -> Result<Vec<Record>> {
    let prepared = records
        .into_iter()
        .filter(|record| is_user_managed(collection, record))
        .map(|mut record| {
            if collection == SchemaCollection::Roles {
                // Users are content, not schema
                record.insert("users".to_string(), Value::Array(Vec::new()));
            }
            with_pk(collection, &record)
        })
        .collect::<Result<Vec<_>>>()?;

    // Rejects duplicate keys before anything is written
    diff_records(collection, &[], &prepared)?;
    Ok(prepared)
}

/// Read every schema collection from the CMS and build a keyed snapshot.
pub async fn capture_snapshot(api: &dyn SchemaApi) -> Result<Snapshot> {
    let (collections, roles, permissions, fields, relations) = tokio::try_join!(
        api.list(SchemaCollection::Collections),
        api.list(SchemaCollection::Roles),
        api.list(SchemaCollection::Permissions),
        api.list(SchemaCollection::Fields),
        api.list(SchemaCollection::Relations),
    )?;

    let snapshot = Snapshot {
        collections: prepare_records(SchemaCollection::Collections, collections)?,
        roles: prepare_records(SchemaCollection::Roles, roles)?,
        permissions: prepare_records(SchemaCollection::Permissions, permissions)?,
        fields: prepare_records(SchemaCollection::Fields, fields)?,
        relations: prepare_records(SchemaCollection::Relations, relations)?,
    };

    log::info!(
        "captured {} schema record(s) across {} collection(s)",
        snapshot.total_records(),
        SchemaCollection::ALL.len()
    );
    Ok(snapshot)
}
