//! Primary-key synthesis for schema records.
//!
//! Each collection has its own natural key. The key is attached to a copy of
//! the record under [`PK`] so the differ can treat every collection alike.

use serde_json::Value;

use crate::errors::{Result, SyncError};
use crate::types::{PK, Record, SchemaCollection, Snapshot};

/// Compute the natural key of `record` within `collection`.
pub fn primary_key(collection: SchemaCollection, record: &Record) -> Result<Value> {
    match collection {
        SchemaCollection::Collections => required(collection, record, "collection").cloned(),
        SchemaCollection::Fields => {
            let owner = required(collection, record, "collection")?;
            let field = required(collection, record, "field")?;
            Ok(Value::String(format!(
                "{}/{}",
                key_string(owner),
                key_string(field)
            )))
        }
        SchemaCollection::Roles | SchemaCollection::Permissions | SchemaCollection::Relations => {
            required(collection, record, "id").cloned()
        }
    }
}

fn required<'a>(
    collection: SchemaCollection,
    record: &'a Record,
    property: &'static str,
) -> Result<&'a Value> {
    match record.get(property) {
        Some(Value::Null) | None => Err(SyncError::MissingKey {
            collection,
            property,
        }),
        Some(value) => Ok(value),
    }
}

/// Shallow copy of `record` with its primary key attached.
pub fn with_pk(collection: SchemaCollection, record: &Record) -> Result<Record> {
    let pk = primary_key(collection, record)?;
    let mut keyed = record.clone();
    keyed.insert(PK.to_string(), pk);
    Ok(keyed)
}

/// Copy of `record` without its primary key, ready to send to the CMS.
///
/// Records embedded under a collection's `fields` list lose their key too.
pub fn strip_pk(record: &Record) -> Record {
    let mut plain = record.clone();
    plain.remove(PK);
    if let Some(Value::Array(embedded)) = plain.get_mut("fields") {
        for item in embedded.iter_mut() {
            if let Value::Object(inner) = item {
                inner.remove(PK);
            }
        }
    }
    plain
}

/// The record's key rendered as text, if it has been keyed.
pub fn pk_of(record: &Record) -> Option<String> {
    record.get(PK).filter(|v| !v.is_null()).map(key_string)
}

/// Render a key value for lookups and endpoint paths.
pub fn key_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Attach keys to every record of a snapshot, replacing any stale `pk`.
pub fn key_snapshot(snapshot: &Snapshot) -> Result<Snapshot> {
    let mut keyed = Snapshot::default();
    for (collection, records) in snapshot.iter() {
        *keyed.records_mut(collection) = records
            .iter()
            .map(|record| with_pk(collection, record))
            .collect::<Result<Vec<_>>>()?;
    }
    Ok(keyed)
}

/// Remove keys from every record of a snapshot.
pub fn unkey_snapshot(snapshot: &Snapshot) -> Snapshot {
    let mut plain = Snapshot::default();
    for (collection, records) in snapshot.iter() {
        *plain.records_mut(collection) = records.iter().map(strip_pk).collect();
    }
    plain
}
