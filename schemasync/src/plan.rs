//! Migration plans: the grouped target diffed against the current snapshot.

use serde::Serialize;

use crate::differ::{DiffResult, diff_records};
use crate::errors::Result;
use crate::group::{group_snapshot, related_fields};
use crate::keys::{key_snapshot, pk_of};
use crate::types::{SchemaCollection, Snapshot, str_prop};

/// Fields that disappear together with a removed collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cascade {
    pub collection: String,
    pub fields: Vec<String>,
}

/// The diff of one schema collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionPlan {
    pub collection: SchemaCollection,
    pub diff: DiffResult,
    /// Number of records in the grouped target list
    pub target_len: usize,
    /// Populated for the `collections` plan only
    pub cascades: Vec<Cascade>,
}

impl CollectionPlan {
    /// Whether every target record already matches the current snapshot.
    pub fn is_unchanged(&self) -> bool {
        self.diff.same.len() == self.target_len && self.diff.removed.is_empty()
    }
}

/// Per-collection diffs in processing order.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationPlan {
    pub collections: Vec<CollectionPlan>,
}

impl MigrationPlan {
    /// Key both snapshots, group the target and diff every collection.
    pub fn build(current: &Snapshot, target: &Snapshot) -> Result<Self> {
        let current = key_snapshot(current)?;
        let target = key_snapshot(target)?;
        let grouped = group_snapshot(&current, &target)?;

        let mut collections = Vec::with_capacity(SchemaCollection::ALL.len());
        for (collection, records) in grouped.iter() {
            let diff = diff_records(collection, current.records(collection), records)?;
            let cascades = match collection {
                SchemaCollection::Collections => diff
                    .removed
                    .iter()
                    .map(|removed| Cascade {
                        collection: str_prop(removed, "collection").unwrap_or_default().to_string(),
                        fields: related_fields(removed, &current)
                            .into_iter()
                            .filter_map(pk_of)
                            .collect(),
                    })
                    .collect(),
                _ => Vec::new(),
            };

            log::debug!(
                "{collection}: {} added, {} updated, {} removed, {} same",
                diff.added.len(),
                diff.updated.len(),
                diff.removed.len(),
                diff.same.len()
            );

            collections.push(CollectionPlan {
                collection,
                diff,
                target_len: records.len(),
                cascades,
            });
        }

        Ok(Self { collections })
    }

    pub fn get(&self, collection: SchemaCollection) -> Option<&CollectionPlan> {
        self.collections.iter().find(|p| p.collection == collection)
    }

    pub fn has_changes(&self) -> bool {
        self.collections.iter().any(|p| p.diff.has_changes())
    }

    pub fn change_count(&self) -> usize {
        self.collections.iter().map(|p| p.diff.change_count()).sum()
    }
}
