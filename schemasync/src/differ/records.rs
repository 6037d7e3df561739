//! Array-of-objects diffing keyed by `pk`.

use std::collections::{HashMap, HashSet};

use super::changes::{DiffResult, FieldChange, UpdatedRecord};
use crate::errors::{Result, SyncError};
use crate::keys::pk_of;
use crate::types::{Record, SchemaCollection};

/// Partition `old` and `new` into added, removed, updated and same.
///
/// Both lists must already be keyed. Partitions keep the order of the list
/// they were drawn from. A duplicate key inside either list is an error.
pub fn diff_records(
    collection: SchemaCollection,
    old: &[Record],
    new: &[Record],
) -> Result<DiffResult> {
    let old_by_pk = index_by_pk(collection, old)?;
    let mut new_pks = HashSet::with_capacity(new.len());
    let mut result = DiffResult::default();

    for record in new {
        let pk = require_pk(collection, record)?;
        if !new_pks.insert(pk.clone()) {
            return Err(SyncError::DuplicateKey { collection, pk });
        }

        match old_by_pk.get(pk.as_str()) {
            None => result.added.push(record.clone()),
            Some(previous) if *previous != record => result.updated.push(UpdatedRecord {
                before: (*previous).clone(),
                after: record.clone(),
            }),
            Some(_) => result.same.push(record.clone()),
        }
    }

    for record in old {
        // Keys were validated while indexing
        let pk = pk_of(record).unwrap_or_default();
        if !new_pks.contains(&pk) {
            result.removed.push(record.clone());
        }
    }

    Ok(result)
}

fn index_by_pk(collection: SchemaCollection, records: &[Record]) -> Result<HashMap<String, &Record>> {
    let mut index = HashMap::with_capacity(records.len());
    for record in records {
        let pk = require_pk(collection, record)?;
        if index.insert(pk.clone(), record).is_some() {
            return Err(SyncError::DuplicateKey { collection, pk });
        }
    }
    Ok(index)
}

fn require_pk(collection: SchemaCollection, record: &Record) -> Result<String> {
    pk_of(record).ok_or(SyncError::Unkeyed { collection })
}

/// Describe how the top-level properties of `before` changed in `after`.
pub fn field_changes(before: &Record, after: &Record) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    for (property, new_value) in after {
        match before.get(property) {
            None => changes.push(FieldChange::added(property.clone(), new_value.clone())),
            Some(old_value) if old_value != new_value => changes.push(FieldChange::modified(
                property.clone(),
                old_value.clone(),
                new_value.clone(),
            )),
            Some(_) => {}
        }
    }

    for (property, old_value) in before {
        if !after.contains_key(property) {
            changes.push(FieldChange::removed(property.clone(), old_value.clone()));
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::differ::ChangeType;
    use crate::types::PK;
    use serde_json::{Value, json};

    fn keyed(pk: &str, extra: Value) -> Record {
        let mut record = match extra {
            Value::Object(map) => map,
            _ => Record::new(),
        };
        record.insert(PK.to_string(), json!(pk));
        record
    }

    fn pks(records: &[Record]) -> Vec<String> {
        records.iter().filter_map(pk_of).collect()
    }

    #[test]
    fn partitions_by_key_and_content() {
        let old = vec![
            keyed("a", json!({"v": 1})),
            keyed("b", json!({"v": 1})),
            keyed("c", json!({"v": 1})),
        ];
        let new = vec![
            keyed("d", json!({"v": 1})),
            keyed("b", json!({"v": 2})),
            keyed("a", json!({"v": 1})),
        ];

        let diff = diff_records(SchemaCollection::Roles, &old, &new).unwrap();
        assert_eq!(pks(&diff.added), vec!["d"]);
        assert_eq!(pks(&diff.removed), vec!["c"]);
        assert_eq!(diff.updated.len(), 1);
        assert_eq!(diff.updated[0].pk(), "b");
        assert_eq!(diff.updated[0].before["v"], json!(1));
        assert_eq!(diff.updated[0].after["v"], json!(2));
        assert_eq!(pks(&diff.same), vec!["a"]);
        assert!(diff.has_changes());
        assert_eq!(diff.change_count(), 3);
    }

    #[test]
    fn partition_sizes_account_for_both_sides() {
        let old = vec![
            keyed("1", json!({})),
            keyed("2", json!({"x": true})),
            keyed("3", json!({})),
        ];
        let new = vec![keyed("2", json!({"x": false})), keyed("4", json!({}))];

        let diff = diff_records(SchemaCollection::Relations, &old, &new).unwrap();
        assert_eq!(diff.added.len() + diff.updated.len() + diff.same.len(), new.len());
        assert_eq!(diff.removed.len() + diff.updated.len() + diff.same.len(), old.len());
    }

    /// Every list over keys a..d where each key is absent or holds one of two values.
    fn all_lists() -> Vec<Vec<Record>> {
        let keys = ["a", "b", "c", "d"];
        (0..3usize.pow(keys.len() as u32))
            .map(|mut code| {
                let mut list = Vec::new();
                for key in keys {
                    match code % 3 {
                        0 => {}
                        value => list.push(keyed(key, json!({"v": value}))),
                    }
                    code /= 3;
                }
                list
            })
            .collect()
    }

    #[test]
    fn partition_sizes_and_self_diff_hold_for_all_small_lists() {
        let lists = all_lists();
        for old in &lists {
            let self_diff = diff_records(SchemaCollection::Roles, old, old).unwrap();
            assert!(!self_diff.has_changes());
            assert_eq!(&self_diff.same, old);

            for new in &lists {
                let diff = diff_records(SchemaCollection::Roles, old, new).unwrap();
                let shared = diff.updated.len() + diff.same.len();
                assert_eq!(diff.added.len() + shared, new.len());
                assert_eq!(diff.removed.len() + shared, old.len());
            }
        }
    }

    #[test]
    fn identical_lists_are_all_same_in_order() {
        let records = vec![
            keyed("z", json!({"n": 1})),
            keyed("y", json!({"n": 2})),
            keyed("x", json!({"n": 3})),
        ];
        let diff = diff_records(SchemaCollection::Fields, &records, &records).unwrap();
        assert!(!diff.has_changes());
        assert_eq!(diff.same, records);
    }

    #[test]
    fn empty_old_side_adds_everything() {
        let new = vec![keyed("posts", json!({})), keyed("events", json!({}))];
        let diff = diff_records(SchemaCollection::Collections, &[], &new).unwrap();
        assert_eq!(pks(&diff.added), vec!["posts", "events"]);
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn property_order_does_not_count_as_change() {
        let mut first = Record::new();
        first.insert("a".into(), json!(1));
        first.insert("b".into(), json!(2));
        first.insert(PK.into(), json!("k"));
        let mut second = Record::new();
        second.insert(PK.into(), json!("k"));
        second.insert("b".into(), json!(2));
        second.insert("a".into(), json!(1));

        let diff = diff_records(SchemaCollection::Roles, &[first], &[second]).unwrap();
        assert_eq!(diff.same.len(), 1);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let new = vec![keyed("dup", json!({})), keyed("dup", json!({"x": 1}))];
        let err = diff_records(SchemaCollection::Permissions, &[], &new).unwrap_err();
        assert!(matches!(err, SyncError::DuplicateKey { pk, .. } if pk == "dup"));

        let err = diff_records(SchemaCollection::Permissions, &new, &[]).unwrap_err();
        assert!(matches!(err, SyncError::DuplicateKey { .. }));
    }

    #[test]
    fn unkeyed_records_are_rejected() {
        let mut unkeyed = Record::new();
        unkeyed.insert("id".into(), json!(1));
        let err = diff_records(SchemaCollection::Roles, &[], &[unkeyed]).unwrap_err();
        assert!(matches!(err, SyncError::Unkeyed { .. }));
    }

    #[test]
    fn field_changes_cover_all_kinds() {
        let before = keyed("posts/title", json!({"type": "string", "note": "old", "hidden": false}));
        let after = keyed("posts/title", json!({"type": "text", "hidden": false, "width": "full"}));

        let changes = field_changes(&before, &after);
        let mut summary: Vec<(String, ChangeType)> = changes
            .iter()
            .map(|c| (c.property.clone(), c.change_type))
            .collect();
        summary.sort_by(|a, b| a.0.cmp(&b.0));

        assert_eq!(
            summary,
            vec![
                ("note".to_string(), ChangeType::Removed),
                ("type".to_string(), ChangeType::Modified),
                ("width".to_string(), ChangeType::Added),
            ]
        );
        let retyped = changes.iter().find(|c| c.property == "type").unwrap();
        assert_eq!(retyped.before, Some(json!("string")));
        assert_eq!(retyped.after, Some(json!("text")));
    }
}
