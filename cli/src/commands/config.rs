// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use crate::config::BifrostConfig;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./bifrost.yaml)
        #[arg(short, long, default_value = "./bifrost.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = BifrostConfig::load(config_override.clone()).context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. BIFROST_CONFIG_PATH: {}",
            std::env::var("BIFROST_CONFIG_PATH").unwrap_or_else(|_| "(not set)".to_string()).dimmed()
        );
        println!("  3. ./bifrost.yaml");
        println!("  4. ~/.bifrost/config.yaml");
        println!("  5. /etc/bifrost/config.yaml");
        println!("  6. BIFROST_DATABASE_URL / BIFROST_REDIS_URL / BIFROST_AMQP_URL env vars");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();
    println!("  Database: {}", redact(&config.database_url));
    println!("  Redis: {}", redact(&config.redis_url));
    println!("  AMQP: {}", redact(&config.amqp_url));
    println!("  HTTP: {}:{}", config.host, config.port);
    println!("  Worker binary: {}", config.worker_binary);
    println!();
    println!("{}", "Worker pool policy:".bold());
    println!("  min_workers: {}", config.worker_pool.min_workers);
    println!("  max_workers: {}", config.worker_pool.max_workers);
    println!("  worker_memory_threshold_mb: {}", config.worker_pool.worker_memory_threshold_mb);
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = BifrostConfig::load(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample).with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());

    Ok(())
}

/// Hides credentials embedded in a connection string's userinfo segment.
fn redact(url: &str) -> String {
    if let Some(scheme_end) = url.find("://") {
        let (scheme, rest) = url.split_at(scheme_end + 3);
        if let Some(at) = rest.find('@') {
            return format!("{scheme}***@{}", &rest[at + 1..]);
        }
    }
    url.to_string()
}
