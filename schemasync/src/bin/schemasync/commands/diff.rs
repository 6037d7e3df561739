use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, CellAlignment, Table};
use serde_json::Value;

use schemasync::keys::{key_string, primary_key};
use schemasync::report::{CollectionReport, DiffReport};
use schemasync::{ChangeType, FieldChange, MigrationPlan, Record, SchemaCollection};

use super::CommandStatus;
use crate::context::SyncContext;
use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};
use crate::theme::ICONS;
use crate::utils::count_label;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Preview an apply",
        commands: &[
            "schemasync diff                           # Summary of schema.json against schema.current.json",
            "schemasync diff --detailed                # Include property-level changes",
            "schemasync diff --collection fields       # Only one schema collection",
        ],
    },
    ExampleGroup {
        title: "CI",
        commands: &[
            "schemasync diff --exit-code               # Exit with status 2 when changes are pending",
            "schemasync --output json diff             # Machine-readable report",
        ],
    },
];

#[derive(Args)]
pub struct DiffArgs {
    /// Show property-level changes for updated records
    #[arg(long)]
    pub detailed: bool,

    /// Only report this schema collection
    #[arg(long)]
    pub collection: Option<SchemaCollection>,

    /// Exit with status 2 when there are pending changes
    #[arg(long)]
    pub exit_code: bool,
}

impl TableDisplay for DiffReport {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        output.add_table_header(&mut table, vec!["Collection", "Added", "Updated", "Removed", "Status"]);
        for report in &self.collections {
            let status = if report.unchanged { "up to date" } else { "pending" };
            table.add_row(vec![
                Cell::new(report.collection.as_str()),
                Cell::new(report.added.len()).set_alignment(CellAlignment::Right),
                Cell::new(report.updated.len()).set_alignment(CellAlignment::Right),
                Cell::new(report.removed.len()).set_alignment(CellAlignment::Right),
                Cell::new(status),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        let pending = self.collections.iter().filter(|c| !c.unchanged).count();
        format!(
            "{} across {}",
            count_label(self.change_count(), "change"),
            count_label(pending, "collection")
        )
    }
}

pub async fn handle_diff(
    args: DiffArgs,
    ctx: &SyncContext,
    output: &OutputManager,
) -> Result<CommandStatus> {
    let store = ctx.store();
    output.heading("Schema Diff");
    output.verbose(&format!("Snapshot directory: {}", store.dir().display()));

    let target = store
        .load_target()
        .with_context(|| format!("Failed to load {}", store.target_path().display()))?;
    let current = store.load_current().with_context(|| {
        format!(
            "Failed to load {}. Run 'schemasync generate' against the target instance first",
            store.current_path().display()
        )
    })?;

    let plan = MigrationPlan::build(&current, &target)?;
    let mut report = DiffReport::from_plan(&plan);
    if let Some(only) = args.collection {
        report.collections.retain(|c| c.collection == only);
    }

    if output.is_human() {
        for collection in &report.collections {
            print_collection(collection, args.detailed, output);
        }
        output.heading("Summary");
    }
    output.display(&report)?;

    if report.has_changes() {
        output.info(&format!(
            "{} pending. Run 'schemasync apply' to apply them",
            count_label(report.change_count(), "change")
        ));
    } else {
        output.success("Schema is up to date");
    }

    if args.exit_code && report.has_changes() {
        return Ok(CommandStatus::ChangesPending);
    }
    Ok(CommandStatus::Success)
}

fn print_collection(report: &CollectionReport, detailed: bool, output: &OutputManager) {
    let collection = report.collection;
    output.subheading(collection.as_str());

    if report.unchanged {
        output.info("No changes");
        return;
    }

    for record in &report.added {
        output.change(ChangeType::Added, &record_label(collection, record));
        if let Some(note) = embedded_fields_note(collection, record) {
            output.indented(ICONS.arrow, &note);
        }
        if detailed {
            output.indented("", &record_body(record));
        }
    }

    for update in &report.updated {
        output.change(ChangeType::Modified, &update.pk);
        if detailed {
            for change in &update.changes {
                output.indented("", &format_change(change));
            }
        }
    }

    for record in &report.removed {
        output.change(ChangeType::Removed, &record_label(collection, record));
        if detailed {
            output.indented("", &record_body(record));
        }
    }

    for cascade in &report.cascades {
        if !cascade.fields.is_empty() {
            output.warning(&format!(
                "Removing collection '{}' also removes {}: {}",
                cascade.collection,
                count_label(cascade.fields.len(), "field"),
                cascade.fields.join(", ")
            ));
        }
    }
}

/// Only new collections carry embedded fields; permissions have an
/// unrelated `fields` list of allowed field names.
fn embedded_fields_note(collection: SchemaCollection, record: &Record) -> Option<String> {
    if collection != SchemaCollection::Collections {
        return None;
    }
    match record.get("fields") {
        Some(Value::Array(fields)) => Some(format!("created with {}", count_label(fields.len(), "field"))),
        _ => None,
    }
}

/// Record as it will be sent or was stored, on one line
fn record_body(record: &Record) -> String {
    Value::Object(record.clone()).to_string()
}

fn record_label(collection: SchemaCollection, record: &Record) -> String {
    primary_key(collection, record)
        .map(|key| key_string(&key))
        .unwrap_or_else(|_| "<unkeyed>".to_string())
}

/// Format a property change, e.g. `~ note: "a" -> "b"`
fn format_change(change: &FieldChange) -> String {
    let show = |value: &Option<Value>| {
        value
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_default()
    };
    match change.change_type {
        ChangeType::Added => format!("{} {}: {}", change.change_type, change.property, show(&change.after)),
        ChangeType::Removed => format!("{} {}", change.change_type, change.property),
        ChangeType::Modified => format!(
            "{} {}: {} -> {}",
            change.change_type,
            change.property,
            show(&change.before),
            show(&change.after)
        ),
    }
}
