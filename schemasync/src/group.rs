//! Grouping of dependent records before a snapshot is diffed.
//!
//! A collection created on its own would sit in an orphan-like state until
//! its fields arrive, so new collections carry their plain fields inline and
//! are created in one request. Relational, alias and translation fields stay
//! on the top-level field path because they need other collections to exist
//! first. Fields of a removed collection disappear with it, so the field
//! diff must not delete them a second time.

use std::collections::HashSet;

use serde_json::Value;

use crate::differ::diff_records;
use crate::errors::Result;
use crate::keys::pk_of;
use crate::types::{Record, SchemaCollection, Snapshot, str_prop};

/// Field types that are never bundled with their collection.
pub const DANGEROUS_FIELD_TYPES: &[&str] = &["translations", "alias", "o2m", "m2m", "m2a"];

/// Collection whose fields are never bundled.
pub const LANGUAGES_COLLECTION: &str = "languages";

/// Whether `field` must be created through the top-level field path.
pub fn is_dangerous(field: &Record) -> bool {
    str_prop(field, "type").is_some_and(|ty| DANGEROUS_FIELD_TYPES.contains(&ty))
        || str_prop(field, "collection") == Some(LANGUAGES_COLLECTION)
}

/// Fields in `snapshot` owned by the `collection` record.
pub fn related_fields<'a>(collection: &Record, snapshot: &'a Snapshot) -> Vec<&'a Record> {
    let Some(name) = str_prop(collection, "collection") else {
        return Vec::new();
    };
    snapshot
        .fields
        .iter()
        .filter(|field| str_prop(field, "collection") == Some(name))
        .collect()
}

/// Derive the apply-safe target snapshot from keyed `old` and `new` snapshots.
pub fn group_snapshot(old: &Snapshot, new: &Snapshot) -> Result<Snapshot> {
    let collection_diff = diff_records(
        SchemaCollection::Collections,
        &old.collections,
        &new.collections,
    )?;
    let mut grouped = new.clone();

    if !collection_diff.added.is_empty() {
        let added_names = collection_names(&collection_diff.added);

        let filled = collection_diff.added.iter().map(|collection| {
            let embedded = related_fields(collection, new)
                .into_iter()
                .filter(|field| !is_dangerous(field))
                .cloned()
                .map(Value::Object)
                .collect();
            let mut filled = collection.clone();
            filled.insert("fields".to_string(), Value::Array(embedded));
            filled
        });

        grouped.collections = new
            .collections
            .iter()
            .filter(|c| !owned_by(c, &added_names))
            .cloned()
            .chain(filled)
            .collect();

        grouped.fields = new
            .fields
            .iter()
            .filter(|f| !owned_by(f, &added_names) || is_dangerous(f))
            .cloned()
            .collect();
    }

    if !collection_diff.removed.is_empty() {
        let removed_names = collection_names(&collection_diff.removed);
        let present: HashSet<String> = grouped.fields.iter().filter_map(pk_of).collect();

        let cascaded: Vec<Record> = old
            .fields
            .iter()
            .filter(|f| owned_by(f, &removed_names))
            .filter(|f| pk_of(f).is_some_and(|pk| !present.contains(&pk)))
            .cloned()
            .collect();

        log::debug!(
            "restoring {} field(s) of {} removed collection(s) into the comparison set",
            cascaded.len(),
            removed_names.len()
        );
        grouped.fields.extend(cascaded);
    }

    Ok(grouped)
}

fn collection_names(collections: &[Record]) -> HashSet<&str> {
    collections
        .iter()
        .filter_map(|c| str_prop(c, "collection"))
        .collect()
}

fn owned_by(record: &Record, names: &HashSet<&str>) -> bool {
    str_prop(record, "collection").is_some_and(|name| names.contains(name))
}
