// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Workflow execution commands
//!
//! These commands drive the execution orchestration core's admission and
//! monitoring surface over HTTP: trigger a workflow run, poll or watch its
//! status, read its logs, cancel it, or block for its synchronous result.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;
use uuid::Uuid;

use crate::daemon::client::CallerPayload;
use crate::daemon::{check_daemon_running, DaemonClient, DaemonStatus};

#[derive(Subcommand)]
pub enum WorkflowCommand {
    /// Trigger a workflow execution
    Trigger {
        /// Workflow id (UUID)
        #[arg(long, conflicts_with = "name")]
        id: Option<Uuid>,

        /// Workflow name
        #[arg(long, conflicts_with = "id")]
        name: Option<String>,

        /// Parameters as a JSON object
        #[arg(long, short = 'i', value_name = "JSON")]
        input: Option<String>,

        /// Individual parameters (key=value)
        #[arg(long = "param", short = 'p', value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Block until the execution reaches a terminal state and print the result
        #[arg(long)]
        sync: bool,

        /// Watch the execution's update stream after triggering
        #[arg(long, short = 'f')]
        follow: bool,

        /// Caller identity recorded on the execution
        #[arg(long)]
        identity: Option<String>,

        /// Caller org id
        #[arg(long)]
        org_id: Option<Uuid>,
    },

    /// Show current execution state
    Status {
        #[arg(value_name = "EXECUTION_ID")]
        execution_id: Uuid,
    },

    /// Fetch execution logs
    Logs {
        #[arg(value_name = "EXECUTION_ID")]
        execution_id: Uuid,

        /// Only return log rows after this sequence number
        #[arg(long, default_value = "0")]
        since_sequence: i64,
    },

    /// Watch an execution's live status updates
    Watch {
        #[arg(value_name = "EXECUTION_ID")]
        execution_id: Uuid,
    },

    /// Request cancellation of a running execution
    Cancel {
        #[arg(value_name = "EXECUTION_ID")]
        execution_id: Uuid,
    },

    /// Block for a synchronous execution result
    Result {
        #[arg(value_name = "EXECUTION_ID")]
        execution_id: Uuid,

        /// Maximum seconds to block before giving up
        #[arg(long, default_value = "30")]
        deadline_seconds: u64,
    },
}

pub async fn handle_command(command: WorkflowCommand, _config_path: Option<PathBuf>, host: &str, port: u16) -> Result<()> {
    match command {
        WorkflowCommand::Trigger { id, name, input, params, sync, follow, identity, org_id } => {
            trigger(host, port, id, name, input, params, sync, follow, identity, org_id).await
        }
        WorkflowCommand::Status { execution_id } => status(host, port, execution_id).await,
        WorkflowCommand::Logs { execution_id, since_sequence } => logs(host, port, execution_id, since_sequence).await,
        WorkflowCommand::Watch { execution_id } => watch(host, port, execution_id).await,
        WorkflowCommand::Cancel { execution_id } => cancel(host, port, execution_id).await,
        WorkflowCommand::Result { execution_id, deadline_seconds } => result(host, port, execution_id, deadline_seconds).await,
    }
}

async fn require_daemon(host: &str, port: u16, action: &str) -> Result<()> {
    match check_daemon_running(host, port).await {
        Ok(DaemonStatus::Running { .. }) => Ok(()),
        Ok(DaemonStatus::Unhealthy { pid, error }) => {
            println!("{}", format!("⚠ Daemon is running (PID: {}) but unhealthy: {}", pid, error).yellow());
            anyhow::bail!("daemon unhealthy")
        }
        _ => {
            println!("{}", format!("{} requires the daemon to be running.", action).red());
            println!("Run 'bifrostd daemon start' to start the daemon.");
            anyhow::bail!("daemon not running")
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn trigger(
    host: &str,
    port: u16,
    id: Option<Uuid>,
    name: Option<String>,
    input_json: Option<String>,
    params: Vec<String>,
    sync: bool,
    follow: bool,
    identity: Option<String>,
    org_id: Option<Uuid>,
) -> Result<()> {
    require_daemon(host, port, "Triggering a workflow").await?;

    if id.is_none() && name.is_none() {
        anyhow::bail!("one of --id or --name is required");
    }

    let mut parameters = serde_json::Map::new();

    if let Some(json) = input_json {
        let parsed: serde_json::Value = serde_json::from_str(&json).context("Invalid JSON input")?;
        if let Some(obj) = parsed.as_object() {
            parameters.extend(obj.clone());
        }
    }

    for param in params {
        let parts: Vec<&str> = param.splitn(2, '=').collect();
        if parts.len() != 2 {
            anyhow::bail!("Invalid parameter format: '{}'. Expected 'key=value'", param);
        }
        let value = serde_json::from_str(parts[1]).unwrap_or_else(|_| serde_json::Value::String(parts[1].to_string()));
        parameters.insert(parts[0].to_string(), value);
    }

    println!("{}", "Triggering workflow execution...".cyan());

    let caller = CallerPayload { identity, org_id, ..Default::default() };
    let client = DaemonClient::new(host, port)?;
    let execution_id = client
        .trigger(id, name, serde_json::Value::Object(parameters), caller, sync)
        .await
        .context("Failed to trigger workflow execution")?;

    println!("{}", "✓ Execution admitted".green().bold());
    println!("  Execution ID: {}", execution_id);

    if sync {
        match client.sync_result(execution_id, 30).await? {
            Some(execution) => println!("{}", serde_json::to_string_pretty(&execution)?),
            None => println!("{}", "Deadline exceeded waiting for result.".yellow()),
        }
        return Ok(());
    }

    if follow {
        client.watch(execution_id).await.context("Failed to watch execution")?;
    }

    Ok(())
}

async fn status(host: &str, port: u16, execution_id: Uuid) -> Result<()> {
    require_daemon(host, port, "Checking execution status").await?;

    let client = DaemonClient::new(host, port)?;
    let execution = client.get_execution(execution_id).await.context("Failed to get execution")?;

    println!("{}", serde_json::to_string_pretty(&execution)?);

    Ok(())
}

async fn logs(host: &str, port: u16, execution_id: Uuid, since_sequence: i64) -> Result<()> {
    require_daemon(host, port, "Fetching logs").await?;

    let client = DaemonClient::new(host, port)?;
    let rows = client.get_logs(execution_id, since_sequence).await.context("Failed to get logs")?;

    for row in rows {
        println!("{}", serde_json::to_string(&row)?);
    }

    Ok(())
}

async fn watch(host: &str, port: u16, execution_id: Uuid) -> Result<()> {
    require_daemon(host, port, "Watching an execution").await?;

    println!("{}", "Watching execution updates...".cyan());
    println!("  Execution ID: {}", execution_id);
    println!();

    let client = DaemonClient::new(host, port)?;
    client.watch(execution_id).await.context("Failed to watch execution")?;

    Ok(())
}

async fn cancel(host: &str, port: u16, execution_id: Uuid) -> Result<()> {
    require_daemon(host, port, "Cancelling an execution").await?;

    let client = DaemonClient::new(host, port)?;
    let new_status = client.cancel(execution_id).await.context("Failed to cancel execution")?;

    println!("{}", format!("✓ Cancellation requested (status: {})", new_status).green());

    Ok(())
}

async fn result(host: &str, port: u16, execution_id: Uuid, deadline_seconds: u64) -> Result<()> {
    require_daemon(host, port, "Fetching a synchronous result").await?;

    let client = DaemonClient::new(host, port)?;
    match client.sync_result(execution_id, deadline_seconds).await? {
        Some(execution) => println!("{}", serde_json::to_string_pretty(&execution)?),
        None => {
            println!("{}", "Deadline exceeded waiting for result.".yellow());
        }
    }

    Ok(())
}
