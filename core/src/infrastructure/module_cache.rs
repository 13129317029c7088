// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Module Cache (C6) read side: `bifrost:module:{path} -> {content, hash}`,
//! 24 h TTL, written by the (out-of-scope) file-index service and read
//! synchronously by the worker's import hook (`spec.md` §3, §4.6 step 5,
//! §9's synchronous module-cache-read design note).

use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

use crate::infrastructure::redis_keys::module_cache_entry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub content: String,
    pub hash: String,
}

#[derive(Clone)]
pub struct RedisModuleCache {
    conn: MultiplexedConnection,
}

impl RedisModuleCache {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    /// Returns `None` on a cache miss (module never indexed, or TTL
    /// expired); the worker maps that to `ModuleNotFound`.
    pub async fn get(&self, path: &str) -> Result<Option<ModuleEntry>, redis::RedisError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(module_cache_entry(path)).await?;
        Ok(raw.and_then(|raw| serde_json::from_str(&raw).ok()))
    }
}
