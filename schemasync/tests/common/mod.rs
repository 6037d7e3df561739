//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use schemasync::client::create_endpoint;
use schemasync::{Record, Result, SchemaApi, SchemaCollection, Snapshot, SyncError};

/// A request the fake CMS received.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Delete { path: String },
    Create { path: String, body: Record },
    Update { path: String, body: Record },
}

impl Call {
    pub fn path(&self) -> &str {
        match self {
            Call::Delete { path } | Call::Create { path, .. } | Call::Update { path, .. } => path,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Call::Delete { .. } => "DELETE",
            Call::Create { .. } => "POST",
            Call::Update { .. } => "PATCH",
        }
    }
}

/// In-memory CMS that records every mutation in order.
#[derive(Default)]
pub struct FakeCms {
    lists: HashMap<SchemaCollection, Vec<Record>>,
    rejected_paths: HashSet<String>,
    calls: Mutex<Vec<Call>>,
}

impl FakeCms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `records` for `GET /<collection>`.
    pub fn with_list(mut self, collection: SchemaCollection, records: Value) -> Self {
        self.lists.insert(collection, records_from(records));
        self
    }

    /// Answer 400 for every mutation of `path`.
    pub fn rejecting(mut self, path: &str) -> Self {
        self.rejected_paths.insert(path.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// `"VERB /path"` for every recorded call.
    pub fn call_log(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|call| format!("{} {}", call.verb(), call.path()))
            .collect()
    }

    fn record(&self, call: Call) -> Result<()> {
        let rejected = self.rejected_paths.contains(call.path());
        let path = call.path().to_string();
        self.calls.lock().unwrap().push(call);
        if rejected {
            return Err(SyncError::Api {
                status: 400,
                body: format!(r#"{{"errors":[{{"message":"rejected {path}"}}]}}"#),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SchemaApi for FakeCms {
    async fn list(&self, collection: SchemaCollection) -> Result<Vec<Record>> {
        Ok(self.lists.get(&collection).cloned().unwrap_or_default())
    }

    async fn create(&self, collection: SchemaCollection, record: &Record) -> Result<()> {
        let path = create_endpoint(collection, record)?;
        self.record(Call::Create {
            path,
            body: record.clone(),
        })
    }

    async fn update(&self, collection: SchemaCollection, pk: &str, record: &Record) -> Result<()> {
        self.record(Call::Update {
            path: format!("/{collection}/{pk}"),
            body: record.clone(),
        })
    }

    async fn delete(&self, collection: SchemaCollection, pk: &str) -> Result<()> {
        self.record(Call::Delete {
            path: format!("/{collection}/{pk}"),
        })
    }
}

pub fn records_from(value: Value) -> Vec<Record> {
    serde_json::from_value(value).expect("records must be JSON objects")
}

/// Build a snapshot from the collections present in `value`; the rest are empty.
pub fn snapshot(value: Value) -> Snapshot {
    let mut base = json!({
        "collections": [],
        "roles": [],
        "permissions": [],
        "fields": [],
        "relations": []
    });
    if let (Value::Object(base_map), Value::Object(extra)) = (&mut base, value) {
        base_map.extend(extra);
    }
    serde_json::from_value(base).expect("snapshot fixture must be valid")
}

/// Write `snapshot` to `path` as pretty JSON.
pub fn write_snapshot(path: &std::path::Path, snapshot: &Snapshot) {
    let json = serde_json::to_string_pretty(snapshot).expect("snapshot serializes");
    std::fs::write(path, json).expect("snapshot fixture written");
}
