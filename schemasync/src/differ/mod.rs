//! Record-level diffing between two snapshots.
//!
//! This module provides functionality to:
//! - Partition two keyed record lists into added, removed, updated and same
//! - Describe the property-level changes of an updated record

mod changes;
mod records;

pub use changes::{ChangeType, DiffResult, FieldChange, UpdatedRecord};
pub use records::{diff_records, field_changes};
