use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, CellAlignment, Table};

use schemasync::{ApplyEvent, ApplyReport, Operation, OutcomeStatus, SchemaCollection, apply_snapshots};

use super::{CommandStatus, connect};
use crate::context::{ConnectionArgs, SyncContext};
use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};
use crate::theme::ICONS;
use crate::utils::{count_label, format_datetime, format_elapsed};

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Apply schema.json to the live instance",
        commands: &[
            "schemasync diff && schemasync apply       # Preview first, then apply",
            "schemasync apply --fail-on-error          # Exit with status 1 if any item was rejected",
        ],
    },
    ExampleGroup {
        title: "Reporting",
        commands: &[
            "schemasync --output json apply            # Every outcome as JSON",
            "RUST_LOG=schemasync=debug schemasync apply # Log each request",
        ],
    },
];

#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Exit with status 1 when any item is rejected by the CMS
    #[arg(long)]
    pub fail_on_error: bool,
}

impl TableDisplay for ApplyReport {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        output.add_table_header(
            &mut table,
            vec!["Collection", "Deleted", "Created", "Updated", "Failed"],
        );
        for collection in SchemaCollection::ALL {
            let failed = self.failed().filter(|o| o.collection == collection).count();
            table.add_row(vec![
                Cell::new(collection.as_str()),
                Cell::new(self.applied_count(collection, Operation::Delete))
                    .set_alignment(CellAlignment::Right),
                Cell::new(self.applied_count(collection, Operation::Create))
                    .set_alignment(CellAlignment::Right),
                Cell::new(self.applied_count(collection, Operation::Update))
                    .set_alignment(CellAlignment::Right),
                Cell::new(failed).set_alignment(CellAlignment::Right),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        format!(
            "{} applied, {} failed",
            self.succeeded().count(),
            self.failed().count()
        )
    }
}

fn failure_table(report: &ApplyReport, output: &OutputManager) -> Table {
    let mut table = output.create_table();
    output.add_table_header(&mut table, vec!["Collection", "Operation", "Key", "Error"]);
    for outcome in report.failed() {
        if let OutcomeStatus::Failed { error } = &outcome.status {
            table.add_row(vec![
                Cell::new(outcome.collection.as_str()),
                Cell::new(outcome.operation.to_string()),
                Cell::new(&outcome.pk),
                Cell::new(error),
            ]);
        }
    }
    table
}

fn progress_verb(operation: Operation) -> &'static str {
    match operation {
        Operation::Delete => "Deleting",
        Operation::Create => "Creating",
        Operation::Update => "Updating",
    }
}

fn report_event(event: &ApplyEvent<'_>, output: &OutputManager) {
    match event {
        ApplyEvent::CollectionStarted(plan) => {
            output.subheading(plan.collection.as_str());
        }
        ApplyEvent::CollectionUnchanged(_) => {
            output.info("No changes");
        }
        ApplyEvent::PhaseStarted {
            collection,
            operation,
            count,
        } => {
            output.info(&format!(
                "{} {}",
                progress_verb(*operation),
                count_label(*count, collection.item_label())
            ));
        }
        ApplyEvent::ItemFinished(outcome) => match &outcome.status {
            OutcomeStatus::Applied => {
                output.indented(ICONS.success, &outcome.pk);
            }
            OutcomeStatus::Failed { error } => {
                output.error(&format!(
                    "{} {} {} failed: {error}",
                    outcome.operation,
                    outcome.collection.item_label(),
                    outcome.pk
                ));
            }
        },
    }
}

pub async fn handle_apply(
    args: ApplyArgs,
    ctx: &SyncContext,
    output: &OutputManager,
) -> Result<CommandStatus> {
    let store = ctx.store();
    output.heading("Apply Schema");

    for path in [store.target_path(), store.current_path()] {
        if !path.exists() {
            output.error(&format!("{} not found", path.display()));
            output.info("Run 'schemasync generate' against this instance and provide schema.json");
            anyhow::bail!("Missing snapshot file {}", path.display());
        }
    }

    let client = connect(ctx, &args.connection, output).await?;

    let report = apply_snapshots(&store, &client, &mut |event: &ApplyEvent<'_>| {
        report_event(event, output)
    })
    .await
    .context("Apply aborted")?;

    output.heading("Summary");
    output.display(&report)?;

    if let Some(finished_at) = report.finished_at {
        output.key_value("Finished", &format_datetime(finished_at));
        output.key_value("Elapsed", &format_elapsed(report.started_at, finished_at));
    }
    output.indented(
        ICONS.file,
        &format!("Backup written to {}", store.previous_path().display()),
    );

    if report.has_failures() {
        let failed = report.failed().count();
        output.warning(&format!("{} rejected by the CMS", count_label(failed, "item")));
        if output.is_human() {
            println!("{}", failure_table(&report, output));
        }
        if args.fail_on_error {
            return Ok(CommandStatus::ItemsFailed);
        }
    } else {
        output.success("Schema applied");
    }

    Ok(CommandStatus::Success)
}
