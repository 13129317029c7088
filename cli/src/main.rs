// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! # Bifrost orchestrator CLI
//!
//! The `bifrostd` binary doubles as the CLI front-end and the daemon
//! composition root.
//!
//! ## Architecture
//!
//! - **Default mode**: CLI commands delegate to the daemon's HTTP API if
//!   it's running.
//! - **Daemon mode**: `bifrostd --daemon` runs the admission gate, worker
//!   pool manager, scheduler, stuck execution monitor, and HTTP API as one
//!   background service.
//! - **Detection**: HTTP health check, falling back to the PID file.
//!
//! ## Commands
//!
//! - `bifrostd daemon start|stop|status|install|uninstall` - daemon lifecycle
//! - `bifrostd workflow trigger|status|logs|watch|cancel|result` - execution operations
//! - `bifrostd queue depth|position` - admitted queue inspection
//! - `bifrostd admin workers|recycle|pool-config|set-pool-config` - worker pool administration
//! - `bifrostd config show|validate|generate` - configuration management
//! - `bifrostd update` - apply pending Postgres migrations

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

mod commands;
mod config;
mod daemon;

use commands::{AdminCommand, ConfigCommand, DaemonCommand, QueueCommand, WorkflowCommand};

/// Bifrost orchestrator - CLI and daemon for the execution orchestration core
#[derive(Parser)]
#[command(name = "bifrostd")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Run as background daemon service
    #[arg(long, global = true)]
    daemon: bool,

    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "BIFROST_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// HTTP API port (default: 8000)
    #[arg(long, global = true, env = "BIFROST_PORT", default_value = "8000")]
    port: u16,

    /// HTTP API host (default: 127.0.0.1)
    #[arg(long, global = true, env = "BIFROST_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "BIFROST_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage daemon lifecycle
    #[command(name = "daemon")]
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Workflow operations
    #[command(name = "workflow")]
    Workflow {
        #[command(subcommand)]
        command: WorkflowCommand,
    },

    /// Admitted queue inspection
    #[command(name = "queue")]
    Queue {
        #[command(subcommand)]
        command: QueueCommand,
    },

    /// Worker pool administration
    #[command(name = "admin")]
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },

    /// Apply pending database migrations
    #[command(name = "update")]
    Update {
        #[command(flatten)]
        command: commands::UpdateCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    if cli.daemon {
        info!("Starting Bifrost orchestrator in daemon mode");
        return daemon::start_daemon(cli.config, cli.host, cli.port).await;
    }

    match cli.command {
        Some(Commands::Daemon { command }) => {
            commands::daemon::handle_command(command, cli.config, &cli.host, cli.port).await
        }
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        Some(Commands::Workflow { command }) => {
            commands::workflow::handle_command(command, cli.config, &cli.host, cli.port).await
        }
        Some(Commands::Queue { command }) => commands::queue::handle_command(command, cli.config, &cli.host, cli.port).await,
        Some(Commands::Admin { command }) => commands::admin::handle_command(command, cli.config, &cli.host, cli.port).await,
        Some(Commands::Update { command }) => commands::update::execute(command).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
