// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Pending Execution store (C2) over Redis. `PendingExecution` is
//! serialized as JSON and written with an expiry so a worker crash before
//! pickup does not leak a key forever (`spec.md` §5).

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::application::admission::PendingStore;
use crate::application::errors::OrchestrationError;
use crate::application::worker_runtime::PendingReader;
use crate::domain::execution::ExecutionId;
use crate::domain::pending::PendingExecution;
use crate::infrastructure::redis_keys::pending_execution;

#[derive(Clone)]
pub struct RedisPendingStore {
    conn: MultiplexedConnection,
}

impl RedisPendingStore {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl PendingStore for RedisPendingStore {
    async fn set_pending(
        &self,
        execution_id: ExecutionId,
        record: &PendingExecution,
        ttl_seconds: u64,
    ) -> Result<(), OrchestrationError> {
        let payload = serde_json::to_string(record)
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(pending_execution(execution_id), payload, ttl_seconds)
            .await
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))
    }
}

#[async_trait]
impl PendingReader for RedisPendingStore {
    async fn get_pending(&self, execution_id: ExecutionId) -> Result<Option<PendingExecution>, OrchestrationError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(pending_execution(execution_id))
            .await
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
        match raw {
            Some(raw) => {
                let record = serde_json::from_str(&raw)
                    .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn delete_pending(&self, execution_id: ExecutionId) -> Result<(), OrchestrationError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(pending_execution(execution_id))
            .await
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))
    }
}
