// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Worker Slot State heartbeats (C5/C11). Each worker refreshes its own
//! heartbeat key while busy; the Stuck Execution Monitor (C11) resolves a
//! candidate execution's assigned worker through the reverse index and
//! checks how long ago that heartbeat was last written.

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::domain::execution::ExecutionId;
use crate::domain::repository::{RepositoryError, WorkerHeartbeatSource};
use crate::infrastructure::redis_keys::{execution_worker_index, worker_assignment, worker_heartbeat};

const HEARTBEAT_TTL_SECONDS: i64 = 15;

#[derive(Clone)]
pub struct RedisWorkerState {
    conn: MultiplexedConnection,
}

impl RedisWorkerState {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    /// Records that `worker_id` has picked up `execution_id`, maintaining
    /// both the forward assignment and the reverse lookup index.
    pub async fn record_assignment(&self, worker_id: u32, execution_id: ExecutionId) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(worker_assignment(worker_id), execution_id.to_string()).await?;
        conn.set::<_, _, ()>(execution_worker_index(execution_id), worker_id).await?;
        self.heartbeat(worker_id).await
    }

    pub async fn clear_assignment(&self, worker_id: u32, execution_id: ExecutionId) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(worker_assignment(worker_id)).await?;
        conn.del::<_, ()>(execution_worker_index(execution_id)).await
    }

    /// Refreshes `worker_id`'s heartbeat timestamp. Call on a fixed interval
    /// (shorter than [`HEARTBEAT_TTL_SECONDS`]) from the `bifrost-worker`
    /// main loop while busy.
    pub async fn heartbeat(&self, worker_id: u32) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(worker_heartbeat(worker_id), Utc::now().timestamp(), HEARTBEAT_TTL_SECONDS as u64)
            .await
    }
}

#[async_trait]
impl WorkerHeartbeatSource for RedisWorkerState {
    async fn last_heartbeat_seconds_ago(&self, execution_id: ExecutionId) -> Result<Option<i64>, RepositoryError> {
        let mut conn = self.conn.clone();
        let worker_id: Option<u32> = conn
            .get(execution_worker_index(execution_id))
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        let Some(worker_id) = worker_id else {
            return Ok(None);
        };
        let last: Option<i64> = conn
            .get(worker_heartbeat(worker_id))
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(last.map(|ts| (Utc::now().timestamp() - ts).max(0)))
    }
}
