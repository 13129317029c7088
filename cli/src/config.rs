// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Daemon configuration: `bifrost.yaml` discovery plus `BIFROST_*` env
//! overrides, in the vein of the teacher's `NodeConfig::load_or_default`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_worker_binary() -> String {
    "bifrost-worker".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerPoolSettings {
    pub min_workers: u32,
    pub max_workers: u32,
    pub worker_memory_threshold_mb: u64,
}

impl Default for WorkerPoolSettings {
    fn default() -> Self {
        Self { min_workers: 2, max_workers: 10, worker_memory_threshold_mb: 300 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BifrostConfig {
    pub database_url: String,
    pub redis_url: String,
    pub amqp_url: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_worker_binary")]
    pub worker_binary: String,
    #[serde(default)]
    pub worker_pool: WorkerPoolSettings,
}

impl BifrostConfig {
    /// Discovery order: explicit `--config` path, `BIFROST_CONFIG_PATH`,
    /// `./bifrost.yaml`, `~/.bifrost/config.yaml`, `/etc/bifrost/config.yaml`.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = &config_path {
            return Self::from_file(path).with_context(|| format!("failed to load config from {:?}", path));
        }

        if let Ok(env_path) = std::env::var("BIFROST_CONFIG_PATH") {
            return Self::from_file(Path::new(&env_path));
        }

        for candidate in discovery_paths() {
            if candidate.exists() {
                return Self::from_file(&candidate);
            }
        }

        Self::from_env()
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))?;
        let mut config: Self = serde_yaml::from_str(&raw).context("failed to parse config YAML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// No config file found: build entirely from `BIFROST_*` env vars,
    /// erroring if the required connection strings are absent.
    fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: std::env::var("BIFROST_DATABASE_URL")
                .context("no config file found and BIFROST_DATABASE_URL is not set")?,
            redis_url: std::env::var("BIFROST_REDIS_URL")
                .context("no config file found and BIFROST_REDIS_URL is not set")?,
            amqp_url: std::env::var("BIFROST_AMQP_URL")
                .context("no config file found and BIFROST_AMQP_URL is not set")?,
            host: std::env::var("BIFROST_HOST").unwrap_or_else(|_| default_host()),
            port: std::env::var("BIFROST_PORT").ok().and_then(|p| p.parse().ok()).unwrap_or_else(default_port),
            worker_binary: std::env::var("BIFROST_WORKER_BINARY").unwrap_or_else(|_| default_worker_binary()),
            worker_pool: WorkerPoolSettings::default(),
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("BIFROST_DATABASE_URL") {
            self.database_url = v;
        }
        if let Ok(v) = std::env::var("BIFROST_REDIS_URL") {
            self.redis_url = v;
        }
        if let Ok(v) = std::env::var("BIFROST_AMQP_URL") {
            self.amqp_url = v;
        }
        if let Ok(v) = std::env::var("BIFROST_HOST") {
            self.host = v;
        }
        if let Ok(v) = std::env::var("BIFROST_PORT") {
            if let Ok(port) = v.parse() {
                self.port = port;
            }
        }
        if let Ok(v) = std::env::var("BIFROST_WORKER_BINARY") {
            self.worker_binary = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_url.is_empty() {
            anyhow::bail!("database_url must not be empty");
        }
        if self.redis_url.is_empty() {
            anyhow::bail!("redis_url must not be empty");
        }
        if self.amqp_url.is_empty() {
            anyhow::bail!("amqp_url must not be empty");
        }
        bifrost_orchestrator_core::domain::worker_pool::PoolPolicy::validated(
            self.worker_pool.min_workers,
            self.worker_pool.max_workers,
            self.worker_pool.worker_memory_threshold_mb,
        )
        .context("invalid worker_pool settings")?;
        Ok(())
    }
}

fn discovery_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("./bifrost.yaml")];
    if let Some(home) = dirs_next::home_dir() {
        paths.push(home.join(".bifrost/config.yaml"));
    }
    paths.push(PathBuf::from("/etc/bifrost/config.yaml"));
    paths
}
