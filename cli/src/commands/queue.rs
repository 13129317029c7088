// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Queue inspection commands

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;
use uuid::Uuid;

use crate::daemon::DaemonClient;

#[derive(Subcommand)]
pub enum QueueCommand {
    /// Show the admitted queue's current depth
    Depth,

    /// Show an execution's position in the admitted queue
    Position {
        #[arg(value_name = "EXECUTION_ID")]
        execution_id: Uuid,
    },
}

pub async fn handle_command(command: QueueCommand, _config_path: Option<PathBuf>, host: &str, port: u16) -> Result<()> {
    let client = DaemonClient::new(host, port)?;

    match command {
        QueueCommand::Depth => {
            let depth = client.queue_depth().await.context("Failed to get queue depth")?;
            println!("{}", format!("Queue depth: {}", depth).cyan());
        }
        QueueCommand::Position { execution_id } => match client.queue_position(execution_id).await? {
            Some(position) => println!("{}", format!("Queue position: {}", position).cyan()),
            None => println!("{}", "Execution is not in the admitted queue.".yellow()),
        },
    }

    Ok(())
}
