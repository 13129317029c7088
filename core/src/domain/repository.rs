// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Repository traits — the ports through which the application layer
//! reaches durable storage. Postgres-backed implementations live in
//! `infrastructure::repositories`; in-memory doubles back the same traits
//! for tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::authorization::AccessRow;
use crate::domain::event::{Event, EventDelivery, EventId};
use crate::domain::execution::{Execution, ExecutionId, ExecutionStatus};
use crate::domain::execution_log::LogRow;
use crate::domain::worker_pool::PoolPolicy;
use crate::domain::workflow::{WorkflowId, WorkflowRecord};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("not found")]
    NotFound,
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound,
            other => RepositoryError::Database(other.to_string()),
        }
    }
}

#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    async fn save(&self, workflow: &WorkflowRecord) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: WorkflowId) -> Result<Option<WorkflowRecord>, RepositoryError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<WorkflowRecord>, RepositoryError>;
    async fn list_scheduled(&self) -> Result<Vec<WorkflowRecord>, RepositoryError>;
    async fn list_all(&self) -> Result<Vec<WorkflowRecord>, RepositoryError>;
}

#[async_trait]
pub trait ExecutionRepository: Send + Sync {
    async fn save(&self, execution: &Execution) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: ExecutionId) -> Result<Option<Execution>, RepositoryError>;
    async fn find_by_workflow(&self, workflow_id: WorkflowId, limit: usize) -> Result<Vec<Execution>, RepositoryError>;
    async fn find_stuck_candidates(&self, older_than_seconds: i64) -> Result<Vec<Execution>, RepositoryError>;
    async fn find_recent(&self, limit: usize) -> Result<Vec<Execution>, RepositoryError>;
}

#[async_trait]
pub trait ExecutionLogRepository: Send + Sync {
    async fn append(&self, row: &LogRow) -> Result<(), RepositoryError>;
    async fn find_by_execution(&self, execution_id: ExecutionId) -> Result<Vec<LogRow>, RepositoryError>;
}

#[async_trait]
pub trait AccessRepository: Send + Sync {
    async fn find_for_workflow(&self, workflow_id: WorkflowId) -> Result<Vec<AccessRow>, RepositoryError>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn save_event(&self, event: &Event) -> Result<(), RepositoryError>;
    async fn save_delivery(&self, delivery: &EventDelivery) -> Result<(), RepositoryError>;
    async fn find_delivery(&self, event_id: EventId, workflow_id: WorkflowId) -> Result<Option<EventDelivery>, RepositoryError>;
}

/// Backs the worker pool configuration persistence supplement
/// (`original_source/api/src/services/worker_pool_config_service.py`).
#[async_trait]
pub trait SystemConfigRepository: Send + Sync {
    async fn get_worker_pool_config(&self) -> Result<Option<PoolPolicy>, RepositoryError>;
    async fn save_worker_pool_config(&self, policy: &PoolPolicy) -> Result<(), RepositoryError>;
    async fn get_webhook_secret(&self, source_id: &str) -> Result<Option<String>, RepositoryError>;
}

/// Thin read needed by the Stuck Execution Monitor (C11) to cross-reference
/// a candidate execution's assigned worker's last heartbeat, without the
/// repository layer depending on Redis directly. Looks up the worker
/// currently holding `execution_id` via the Worker Slot State index and
/// returns how long ago its heartbeat was refreshed.
#[async_trait]
pub trait WorkerHeartbeatSource: Send + Sync {
    async fn last_heartbeat_seconds_ago(&self, execution_id: ExecutionId) -> Result<Option<i64>, RepositoryError>;
}

pub fn execution_is_stuck_candidate(execution: &Execution, now_seconds_since_start: i64, threshold_seconds: i64) -> bool {
    execution.status == ExecutionStatus::Running && now_seconds_since_start >= threshold_seconds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::{Execution, TriggerSource};
    use crate::domain::workflow::WorkflowId;

    #[test]
    fn running_past_threshold_is_stuck_candidate() {
        let exec = Execution::new(
            ExecutionId::new(),
            WorkflowId::new(),
            "demo",
            serde_json::json!({}),
            None,
            TriggerSource::Schedule,
        );
        let mut running = exec;
        running.start(None).unwrap();
        assert!(execution_is_stuck_candidate(&running, 700, 600));
        assert!(!execution_is_stuck_candidate(&running, 100, 600));
    }
}
