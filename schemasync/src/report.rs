//! Read-only view of a migration plan, for previews and audits.

use serde::Serialize;

use crate::differ::{FieldChange, field_changes};
use crate::keys::strip_pk;
use crate::plan::{Cascade, MigrationPlan};
use crate::types::{Record, SchemaCollection};

#[derive(Debug, Clone, Serialize)]
pub struct UpdateSummary {
    pub pk: String,
    pub after: Record,
    pub changes: Vec<FieldChange>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionReport {
    pub collection: SchemaCollection,
    pub unchanged: bool,
    pub added: Vec<Record>,
    pub updated: Vec<UpdateSummary>,
    pub removed: Vec<Record>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cascades: Vec<Cascade>,
}

/// What an apply would do, collection by collection.
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    pub collections: Vec<CollectionReport>,
}

impl DiffReport {
    pub fn from_plan(plan: &MigrationPlan) -> Self {
        let collections = plan
            .collections
            .iter()
            .map(|p| CollectionReport {
                collection: p.collection,
                unchanged: p.is_unchanged(),
                added: p.diff.added.iter().map(strip_pk).collect(),
                updated: p
                    .diff
                    .updated
                    .iter()
                    .map(|u| {
                        let before = strip_pk(&u.before);
                        let after = strip_pk(&u.after);
                        UpdateSummary {
                            pk: u.pk(),
                            changes: field_changes(&before, &after),
                            after,
                        }
                    })
                    .collect(),
                removed: p.diff.removed.iter().map(strip_pk).collect(),
                cascades: p.cascades.clone(),
            })
            .collect();
        Self { collections }
    }

    pub fn has_changes(&self) -> bool {
        self.collections.iter().any(|c| !c.unchanged)
    }

    pub fn change_count(&self) -> usize {
        self.collections
            .iter()
            .map(|c| c.added.len() + c.updated.len() + c.removed.len())
            .sum()
    }
}
