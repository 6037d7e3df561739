//! Applying a migration plan to the live CMS.
//!
//! Collections are processed in plan order. Inside each collection removed
//! records are deleted first, then added records are created, then updated
//! records are patched, so a recreated record never collides with its stale
//! predecessor. Every call is awaited before the next one starts; a failed
//! item is recorded and the run carries on.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::client::SchemaApi;
use crate::errors::Result;
use crate::keys::{pk_of, strip_pk};
use crate::plan::{CollectionPlan, MigrationPlan};
use crate::store::SnapshotStore;
use crate::types::{Record, SchemaCollection};

/// Mutation issued for a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Delete,
    Create,
    Update,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Delete => write!(f, "delete"),
            Operation::Create => write!(f, "create"),
            Operation::Update => write!(f, "update"),
        }
    }
}

/// Where the applier is in its walk over the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyState {
    Idle,
    Diffing(SchemaCollection),
    Deleting(SchemaCollection),
    Creating(SchemaCollection),
    Updating(SchemaCollection),
}

/// Result of one record-level call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OutcomeStatus {
    Applied,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub collection: SchemaCollection,
    pub operation: Operation,
    pub pk: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }
}

/// Every outcome of an apply run.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcomes: Vec<Outcome>,
    /// Collections that needed no calls
    pub unchanged: Vec<SchemaCollection>,
}

impl Default for ApplyReport {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            outcomes: Vec::new(),
            unchanged: Vec::new(),
        }
    }
}

impl ApplyReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| !o.is_failure())
    }

    pub fn failed(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    /// Successful calls of `operation` against `collection`
    pub fn applied_count(&self, collection: SchemaCollection, operation: Operation) -> usize {
        self.succeeded()
            .filter(|o| o.collection == collection && o.operation == operation)
            .count()
    }
}

/// Progress notifications emitted while a plan is applied.
#[derive(Debug)]
pub enum ApplyEvent<'a> {
    CollectionStarted(&'a CollectionPlan),
    PhaseStarted {
        collection: SchemaCollection,
        operation: Operation,
        count: usize,
    },
    ItemFinished(&'a Outcome),
    CollectionUnchanged(SchemaCollection),
}

/// Walks a [`MigrationPlan`] and issues the calls it implies.
pub struct Applier<'a> {
    api: &'a dyn SchemaApi,
    state: ApplyState,
}

impl<'a> Applier<'a> {
    pub fn new(api: &'a dyn SchemaApi) -> Self {
        Self {
            api,
            state: ApplyState::Idle,
        }
    }

    pub fn state(&self) -> ApplyState {
        self.state
    }

    /// Apply every collection of `plan` without progress notifications.
    pub async fn apply(&mut self, plan: &MigrationPlan) -> ApplyReport {
        self.apply_with(plan, &mut |_: &ApplyEvent<'_>| {}).await
    }

    /// Apply every collection of `plan`, reporting progress to `observer`.
    pub async fn apply_with(
        &mut self,
        plan: &MigrationPlan,
        observer: &mut dyn FnMut(&ApplyEvent<'_>),
    ) -> ApplyReport {
        let mut report = ApplyReport::default();
        for collection_plan in &plan.collections {
            self.apply_collection(collection_plan, &mut report, observer)
                .await;
        }
        report.finished_at = Some(Utc::now());
        log::info!(
            "apply finished: {} applied, {} failed",
            report.succeeded().count(),
            report.failed().count()
        );
        report
    }

    /// Apply one collection: delete, then create, then update.
    pub async fn apply_collection(
        &mut self,
        plan: &CollectionPlan,
        report: &mut ApplyReport,
        observer: &mut dyn FnMut(&ApplyEvent<'_>),
    ) {
        let collection = plan.collection;
        self.transition(ApplyState::Diffing(collection));
        observer(&ApplyEvent::CollectionStarted(plan));

        if plan.is_unchanged() {
            log::info!("{collection}: no changes");
            report.unchanged.push(collection);
            observer(&ApplyEvent::CollectionUnchanged(collection));
            self.transition(ApplyState::Idle);
            return;
        }

        self.transition(ApplyState::Deleting(collection));
        self.run_phase(collection, Operation::Delete, &plan.diff.removed, report, observer)
            .await;

        self.transition(ApplyState::Creating(collection));
        self.run_phase(collection, Operation::Create, &plan.diff.added, report, observer)
            .await;

        self.transition(ApplyState::Updating(collection));
        let updated: Vec<Record> = plan.diff.updated.iter().map(|u| u.after.clone()).collect();
        self.run_phase(collection, Operation::Update, &updated, report, observer)
            .await;

        self.transition(ApplyState::Idle);
    }

    async fn run_phase(
        &mut self,
        collection: SchemaCollection,
        operation: Operation,
        records: &[Record],
        report: &mut ApplyReport,
        observer: &mut dyn FnMut(&ApplyEvent<'_>),
    ) {
        if records.is_empty() {
            return;
        }
        log::info!(
            "{collection}: {operation} {} {}(s)",
            records.len(),
            collection.item_label()
        );
        observer(&ApplyEvent::PhaseStarted {
            collection,
            operation,
            count: records.len(),
        });

        for record in records {
            let pk = pk_of(record).unwrap_or_default();
            let status = match self.call(collection, operation, &pk, record).await {
                Ok(()) => OutcomeStatus::Applied,
                Err(err) => {
                    log::warn!("{collection}: {operation} {pk} failed: {err}");
                    OutcomeStatus::Failed {
                        error: err.to_string(),
                    }
                }
            };
            report.outcomes.push(Outcome {
                collection,
                operation,
                pk,
                status,
            });
            if let Some(outcome) = report.outcomes.last() {
                observer(&ApplyEvent::ItemFinished(outcome));
            }
        }
    }

    async fn call(
        &self,
        collection: SchemaCollection,
        operation: Operation,
        pk: &str,
        record: &Record,
    ) -> Result<()> {
        match operation {
            Operation::Delete => self.api.delete(collection, pk).await,
            Operation::Create => self.api.create(collection, &strip_pk(record)).await,
            Operation::Update => self.api.update(collection, pk, &strip_pk(record)).await,
        }
    }

    fn transition(&mut self, next: ApplyState) {
        log::debug!("apply state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Plan the target against the current snapshot, apply it, then rotate the
/// current snapshot into the backup slot.
///
/// Per-item failures are part of the report; only local file errors and
/// malformed snapshots abort the run.
pub async fn apply_snapshots(
    store: &SnapshotStore,
    api: &dyn SchemaApi,
    observer: &mut dyn FnMut(&ApplyEvent<'_>),
) -> Result<ApplyReport> {
    let target = store.load_target()?;
    let current = store.load_current()?;
    let plan = MigrationPlan::build(&current, &target)?;

    let report = Applier::new(api).apply_with(&plan, observer).await;
    store.rotate()?;
    Ok(report)
}
