// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Queue Position Tracker (C3) over a Redis sorted set keyed by enqueue
//! time, mirroring `spec.md` §4.3's `ZADD`/`ZRANGE`/`ZREM` mechanics. Every
//! mutation re-publishes each queued execution's position on its update
//! channel, per `spec.md` §8 scenario 6.

use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::application::admission::QueueTracker;
use crate::application::errors::OrchestrationError;
use crate::application::log_fanout::UpdateChannel;
use crate::application::worker_runtime::QueueTrackerRemove;
use crate::domain::execution::ExecutionId;
use crate::domain::execution_log::UpdateEvent;
use crate::domain::queue::{positions, QueueEntry, DEFAULT_QUEUE_SWEEP_MAX_AGE_SECONDS};
use crate::infrastructure::redis_keys::QUEUE_SET;

#[derive(Clone)]
pub struct RedisQueueTracker {
    conn: MultiplexedConnection,
    update_channel: Arc<dyn UpdateChannel>,
}

impl RedisQueueTracker {
    pub fn new(conn: MultiplexedConnection, update_channel: Arc<dyn UpdateChannel>) -> Self {
        Self { conn, update_channel }
    }

    /// Re-publishes `{type: queue_position}` for every still-queued
    /// execution, reflecting the position shift the mutation just caused.
    async fn publish_positions(&self) -> Result<(), OrchestrationError> {
        let snapshot = self.snapshot().await?;
        for (execution_id, position) in positions(snapshot) {
            let event = UpdateEvent::QueuePosition { execution_id, position: Some(position) };
            if let Err(e) = self.update_channel.publish(execution_id, event).await {
                tracing::warn!(execution_id = %execution_id, error = %e, "failed to publish queue position");
            }
        }
        Ok(())
    }

    pub async fn depth(&self) -> Result<u64, OrchestrationError> {
        let mut conn = self.conn.clone();
        conn.zcard(QUEUE_SET)
            .await
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))
    }

    /// Position of `execution_id` in the FIFO queue, 1-based, or `None` if
    /// it has already been dequeued (dispatched, cancelled, or expired).
    pub async fn position(&self, execution_id: ExecutionId) -> Result<Option<u64>, OrchestrationError> {
        let snapshot = self.snapshot().await?;
        Ok(positions(snapshot)
            .into_iter()
            .find(|(id, _)| *id == execution_id)
            .map(|(_, pos)| pos))
    }

    async fn snapshot(&self) -> Result<Vec<QueueEntry>, OrchestrationError> {
        let mut conn = self.conn.clone();
        let raw: Vec<(String, f64)> = conn
            .zrange_withscores(QUEUE_SET, 0, -1)
            .await
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
        raw.into_iter()
            .map(|(id, score)| {
                ExecutionId::parse(&id)
                    .map(|execution_id| QueueEntry { execution_id, enqueued_at_seconds: score })
                    .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))
            })
            .collect()
    }

    /// Sweeps entries older than [`DEFAULT_QUEUE_SWEEP_MAX_AGE_SECONDS`] that
    /// never got dispatched (e.g. a broker outage dropped the message).
    pub async fn sweep_stale(&self, now_seconds: f64) -> Result<u64, OrchestrationError> {
        let mut conn = self.conn.clone();
        let cutoff = now_seconds - DEFAULT_QUEUE_SWEEP_MAX_AGE_SECONDS as f64;
        conn.zrembyscore(QUEUE_SET, f64::NEG_INFINITY, cutoff)
            .await
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))
    }
}

#[async_trait]
impl QueueTracker for RedisQueueTracker {
    async fn add(&self, execution_id: ExecutionId) -> Result<u64, OrchestrationError> {
        let mut conn = self.conn.clone();
        let now = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
        conn.zadd::<_, _, _, ()>(QUEUE_SET, execution_id.to_string(), now)
            .await
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
        let depth = self.depth().await?;
        self.publish_positions().await?;
        Ok(depth)
    }
}

#[async_trait]
impl QueueTrackerRemove for RedisQueueTracker {
    async fn remove(&self, execution_id: ExecutionId) -> Result<(), OrchestrationError> {
        let mut conn = self.conn.clone();
        conn.zrem::<_, _, ()>(QUEUE_SET, execution_id.to_string())
            .await
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
        self.publish_positions().await
    }
}
