pub mod apply;
pub mod diff;
pub mod generate;

use anyhow::{Context, Result};

use schemasync::DirectusClient;

use crate::context::{ConnectionArgs, SyncContext};
use crate::output::OutputManager;

/// How the process should exit once a command has finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    /// `diff --exit-code` found changes
    ChangesPending,
    /// `apply --fail-on-error` saw at least one rejected item
    ItemsFailed,
}

impl CommandStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            CommandStatus::Success => 0,
            CommandStatus::ItemsFailed => 1,
            CommandStatus::ChangesPending => 2,
        }
    }
}

/// Resolve URL and credentials, then authenticate against the CMS
pub async fn connect(
    ctx: &SyncContext,
    args: &ConnectionArgs,
    output: &OutputManager,
) -> Result<DirectusClient> {
    let url = ctx.api_url(args)?;
    let credentials = ctx.credentials(args)?;
    output.verbose(&format!("Using credentials {credentials:?}"));

    output.progress(&format!("Connecting to {url}"));
    let client = DirectusClient::connect(&url, credentials).await;
    output.clear_line();

    let client = client.with_context(|| format!("Failed to authenticate against {url}"))?;
    output.success(&format!("Connected to {}", client.base_url()));
    Ok(client)
}
