//! schemasync core library.
//!
//! Keeps a Directus schema in version control: capture the live schema as a
//! snapshot, diff a desired snapshot against the last applied one, and apply
//! the difference through the REST API.

pub mod apply;
pub mod client;
pub mod differ;
pub mod errors;
pub mod generate;
pub mod group;
pub mod keys;
pub mod plan;
pub mod report;
pub mod store;
pub mod types;

pub use apply::{
    Applier, ApplyEvent, ApplyReport, ApplyState, Operation, Outcome, OutcomeStatus,
    apply_snapshots,
};
pub use client::{Credentials, DirectusClient, SchemaApi};
pub use differ::{ChangeType, DiffResult, FieldChange, UpdatedRecord, diff_records, field_changes};
pub use errors::{Result, SyncError};
pub use generate::capture_snapshot;
pub use group::{group_snapshot, is_dangerous, related_fields};
pub use plan::{Cascade, CollectionPlan, MigrationPlan};
pub use report::DiffReport;
pub use store::SnapshotStore;
pub use types::{PK, Record, SchemaCollection, Snapshot};
