// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Log & Result Fan-out (C8) — `spec.md` §4.8.

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::errors::OrchestrationError;
use crate::domain::execution::{Execution, ExecutionId};
use crate::domain::execution_log::{LogLevel, LogRow, UpdateEvent};
use crate::domain::repository::ExecutionLogRepository;

/// Publishes an [`UpdateEvent`] to the per-execution pub/sub update channel.
/// Backed by `infrastructure::redis_pubsub`.
#[async_trait]
pub trait UpdateChannel: Send + Sync {
    async fn publish(&self, execution_id: ExecutionId, event: UpdateEvent) -> Result<(), OrchestrationError>;
}

/// Pushes the terminal record onto the per-execution Result Inbox and blocks
/// a sync caller's `BLPOP`. Backed by `infrastructure::redis_store`.
#[async_trait]
pub trait ResultInbox: Send + Sync {
    async fn push(&self, execution_id: ExecutionId, execution: &Execution, ttl_seconds: u64) -> Result<(), OrchestrationError>;
}

pub struct LogFanout {
    log_repository: Arc<dyn ExecutionLogRepository>,
    update_channel: Arc<dyn UpdateChannel>,
    result_inbox: Arc<dyn ResultInbox>,
}

impl LogFanout {
    pub fn new(
        log_repository: Arc<dyn ExecutionLogRepository>,
        update_channel: Arc<dyn UpdateChannel>,
        result_inbox: Arc<dyn ResultInbox>,
    ) -> Self {
        Self {
            log_repository,
            update_channel,
            result_inbox,
        }
    }

    pub async fn append_log(
        &self,
        execution_id: ExecutionId,
        sequence: i64,
        level: LogLevel,
        message: String,
        metadata: serde_json::Value,
    ) -> Result<(), OrchestrationError> {
        let row = LogRow {
            execution_id,
            sequence,
            timestamp: chrono::Utc::now(),
            level,
            message: message.clone(),
            metadata,
        };
        self.log_repository.append(&row).await?;
        self.update_channel
            .publish(execution_id, UpdateEvent::Log { execution_id, sequence, level, message })
            .await
    }

    pub async fn publish_progress(&self, execution_id: ExecutionId, phase: String, fraction: Option<f64>) -> Result<(), OrchestrationError> {
        self.update_channel
            .publish(execution_id, UpdateEvent::Progress { execution_id, phase, fraction })
            .await
    }

    pub async fn publish_status(&self, execution: &Execution) -> Result<(), OrchestrationError> {
        self.update_channel
            .publish(execution.id, UpdateEvent::Status { execution_id: execution.id, status: execution.status })
            .await
    }

    pub async fn deliver_sync_result(&self, execution: &Execution, ttl_seconds: u64) -> Result<(), OrchestrationError> {
        self.result_inbox.push(execution.id, execution, ttl_seconds).await
    }
}
