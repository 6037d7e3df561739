use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use comfy_table::{Cell, CellAlignment, Table};
use serde::Serialize;

use schemasync::{SchemaCollection, Snapshot, capture_snapshot};

use super::{CommandStatus, connect};
use crate::context::{ConnectionArgs, SyncContext};
use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};
use crate::utils::{count_label, format_datetime};

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Capture the live schema",
        commands: &[
            "schemasync generate                              # Writes ./directus/schema.current.json",
            "schemasync --dir ./cms/schema generate           # Use another snapshot directory",
        ],
    },
    ExampleGroup {
        title: "Authentication",
        commands: &[
            "DIRECTUS_TOKEN=... schemasync generate           # Static token",
            "schemasync generate --url http://localhost:8055 --email admin@example.com --password ...",
        ],
    },
];

#[derive(Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Debug, Serialize)]
struct CollectionCount {
    collection: SchemaCollection,
    records: usize,
}

/// What `generate` wrote
#[derive(Debug, Serialize)]
struct SnapshotSummary {
    path: String,
    generated_at: DateTime<Utc>,
    collections: Vec<CollectionCount>,
    total: usize,
}

impl SnapshotSummary {
    fn new(snapshot: &Snapshot, path: &std::path::Path) -> Self {
        Self {
            path: path.display().to_string(),
            generated_at: Utc::now(),
            collections: snapshot
                .iter()
                .map(|(collection, records)| CollectionCount {
                    collection,
                    records: records.len(),
                })
                .collect(),
            total: snapshot.total_records(),
        }
    }
}

impl TableDisplay for SnapshotSummary {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        output.add_table_header(&mut table, vec!["Collection", "Records"]);
        for count in &self.collections {
            table.add_row(vec![
                Cell::new(count.collection.as_str()),
                Cell::new(count.records).set_alignment(CellAlignment::Right),
            ]);
        }
        table.add_row(vec![
            Cell::new("total"),
            Cell::new(self.total).set_alignment(CellAlignment::Right),
        ]);
        table
    }

    fn to_compact(&self) -> String {
        format!("{} {}", self.path, count_label(self.total, "record"))
    }
}

pub async fn handle_generate(
    args: GenerateArgs,
    ctx: &SyncContext,
    output: &OutputManager,
) -> Result<CommandStatus> {
    output.heading("Generate Snapshot");

    let client = connect(ctx, &args.connection, output).await?;

    output.progress("Reading schema");
    let snapshot = capture_snapshot(&client).await;
    output.clear_line();
    let snapshot = snapshot.context("Failed to read the schema")?;

    let path = ctx
        .store()
        .save_current(&snapshot)
        .context("Failed to write the snapshot")?;

    let summary = SnapshotSummary::new(&snapshot, &path);
    output.display(&summary)?;
    output.success(&format!(
        "Wrote {} to {}",
        count_label(summary.total, "record"),
        summary.path
    ));
    output.key_value("Generated", &format_datetime(summary.generated_at));
    output.info("Copy it to schema.json in the target project, then run 'schemasync apply' there");

    Ok(CommandStatus::Success)
}
