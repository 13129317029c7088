// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Worker pool administration commands

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use crate::daemon::client::PoolConfig;
use crate::daemon::DaemonClient;

#[derive(Subcommand)]
pub enum AdminCommand {
    /// List worker pool slots and their current state
    Workers,

    /// Recycle a worker (gracefully retire and replace it)
    Recycle {
        #[arg(value_name = "WORKER_ID")]
        worker_id: u32,
    },

    /// Show the worker pool sizing policy
    PoolConfig,

    /// Update the worker pool sizing policy
    SetPoolConfig {
        #[arg(long)]
        min_workers: u32,

        #[arg(long)]
        max_workers: u32,

        #[arg(long)]
        worker_memory_threshold_mb: u64,
    },
}

pub async fn handle_command(command: AdminCommand, _config_path: Option<PathBuf>, host: &str, port: u16) -> Result<()> {
    let client = DaemonClient::new(host, port)?;

    match command {
        AdminCommand::Workers => {
            let workers = client.list_workers().await.context("Failed to list workers")?;
            if workers.is_empty() {
                println!("{}", "No workers registered.".yellow());
                return Ok(());
            }
            for worker in workers {
                println!(
                    "{} state={} execution={} pid={}",
                    format!("worker-{}", worker.id).bold(),
                    worker.state,
                    worker.current_execution_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
                    worker.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
                );
            }
        }
        AdminCommand::Recycle { worker_id } => {
            client.recycle_worker(worker_id).await.context("Failed to recycle worker")?;
            println!("{}", format!("✓ Worker {} recycled", worker_id).green());
        }
        AdminCommand::PoolConfig => {
            let config = client.get_pool_config().await.context("Failed to get worker pool config")?;
            println!("min_workers: {}", config.min_workers);
            println!("max_workers: {}", config.max_workers);
            println!("worker_memory_threshold_mb: {}", config.worker_memory_threshold_mb);
        }
        AdminCommand::SetPoolConfig { min_workers, max_workers, worker_memory_threshold_mb } => {
            let updated = client
                .set_pool_config(PoolConfig { min_workers, max_workers, worker_memory_threshold_mb })
                .await
                .context("Failed to update worker pool config")?;
            println!("{}", "✓ Worker pool config updated".green());
            println!("min_workers: {}", updated.min_workers);
            println!("max_workers: {}", updated.max_workers);
            println!("worker_memory_threshold_mb: {}", updated.worker_memory_threshold_mb);
        }
    }

    Ok(())
}
