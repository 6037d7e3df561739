//! Types for representing record changes between snapshots.

use serde::Serialize;
use serde_json::Value;

use crate::keys::pk_of;
use crate::types::Record;

/// Partitioned diff of one collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiffResult {
    /// Target records with no counterpart in the current snapshot
    pub added: Vec<Record>,
    /// Current records with no counterpart in the target snapshot
    pub removed: Vec<Record>,
    /// Records present on both sides with differing content
    pub updated: Vec<UpdatedRecord>,
    /// Target records identical to their current counterpart
    pub same: Vec<Record>,
}

impl DiffResult {
    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty() || !self.updated.is_empty()
    }

    /// Number of mutating operations applying this diff takes
    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len() + self.updated.len()
    }
}

/// A record whose key matched on both sides but whose content did not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdatedRecord {
    pub before: Record,
    pub after: Record,
}

impl UpdatedRecord {
    pub fn pk(&self) -> String {
        pk_of(&self.after).unwrap_or_default()
    }
}

/// Property-level change inside an updated record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    /// Property name
    pub property: String,
    /// Type of change
    pub change_type: ChangeType,
    /// Value before (for modified/removed)
    pub before: Option<Value>,
    /// Value after (for added/modified)
    pub after: Option<Value>,
}

impl FieldChange {
    pub fn added(property: String, value: Value) -> Self {
        Self {
            property,
            change_type: ChangeType::Added,
            before: None,
            after: Some(value),
        }
    }

    pub fn removed(property: String, value: Value) -> Self {
        Self {
            property,
            change_type: ChangeType::Removed,
            before: Some(value),
            after: None,
        }
    }

    pub fn modified(property: String, before: Value, after: Value) -> Self {
        Self {
            property,
            change_type: ChangeType::Modified,
            before: Some(before),
            after: Some(after),
        }
    }
}

/// Type of change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeType::Added => write!(f, "+"),
            ChangeType::Removed => write!(f, "-"),
            ChangeType::Modified => write!(f, "~"),
        }
    }
}
