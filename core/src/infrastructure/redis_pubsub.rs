// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Update Channel and Result Inbox (C8) over Redis pub/sub and a
//! list-as-mailbox, per `spec.md` §4.8: `PUBLISH` on the per-execution
//! channel for live log/status/progress fan-out, `LPUSH` + `EXPIRE` on the
//! per-execution inbox key so a sync caller's `BLPOP` wakes immediately.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::application::errors::OrchestrationError;
use crate::application::log_fanout::{ResultInbox, UpdateChannel};
use crate::domain::execution::{Execution, ExecutionId};
use crate::domain::execution_log::UpdateEvent;
use crate::infrastructure::redis_keys::{result_inbox, update_channel};

#[derive(Clone)]
pub struct RedisUpdateChannel {
    conn: MultiplexedConnection,
}

impl RedisUpdateChannel {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl UpdateChannel for RedisUpdateChannel {
    async fn publish(&self, execution_id: ExecutionId, event: UpdateEvent) -> Result<(), OrchestrationError> {
        let payload = serde_json::to_string(&event)
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
        let mut conn = self.conn.clone();
        conn.publish::<_, _, ()>(update_channel(execution_id), payload)
            .await
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))
    }
}

#[derive(Clone)]
pub struct RedisResultInbox {
    conn: MultiplexedConnection,
}

impl RedisResultInbox {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl ResultInbox for RedisResultInbox {
    async fn push(&self, execution_id: ExecutionId, execution: &Execution, ttl_seconds: u64) -> Result<(), OrchestrationError> {
        let payload = serde_json::to_string(execution)
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
        let key = result_inbox(execution_id);
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(&key, payload)
            .await
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
        conn.expire::<_, ()>(&key, ttl_seconds as i64)
            .await
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))
    }
}

/// Opens a dedicated (non-multiplexed) connection and subscribes to a
/// single execution's update channel, for the `GET /executions/{id}/updates`
/// SSE handler. Multiplexed connections cannot enter pub/sub mode.
pub async fn subscribe_updates(
    client: &redis::Client,
    execution_id: ExecutionId,
) -> Result<redis::aio::PubSub, redis::RedisError> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(update_channel(execution_id)).await?;
    Ok(pubsub)
}

/// `BLPOP sync_result(id, deadline)` (`spec.md` §6). Opens a dedicated
/// connection per call: a blocking command on a shared multiplexed
/// connection would stall every other command sharing it.
pub async fn blpop_result(
    client: &redis::Client,
    execution_id: ExecutionId,
    timeout_seconds: u64,
) -> Result<Option<Execution>, redis::RedisError> {
    let mut conn = client.get_async_connection().await?;
    let reply: Option<(String, String)> = redis::AsyncCommands::blpop(&mut conn, result_inbox(execution_id), timeout_seconds as f64).await?;
    match reply {
        Some((_key, payload)) => {
            let execution = serde_json::from_str(&payload).map_err(|e| {
                redis::RedisError::from((redis::ErrorKind::TypeError, "malformed result payload", e.to_string()))
            })?;
            Ok(Some(execution))
        }
        None => Ok(None),
    }
}
