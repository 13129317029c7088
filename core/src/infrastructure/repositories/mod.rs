// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Postgres-backed implementations of the `domain::repository` ports, plus
//! `InMemory*` doubles used by tests and by the CLI's `--no-db` dev mode.
//!
//! # Available Implementations
//!
//! ## PostgreSQL
//! - `postgres_workflow::PostgresWorkflowRepository`
//! - `postgres_execution::PostgresExecutionRepository`
//! - `postgres_execution_log::PostgresExecutionLogRepository`
//! - `postgres_access::PostgresAccessRepository`
//! - `postgres_event::PostgresEventRepository`
//! - `postgres_config::PostgresSystemConfigRepository`
//! - `postgres_subscription::PostgresSubscriptionResolver`
//!
//! ## In-memory
//! Thread-safe `HashMap`-backed doubles for unit tests and local dev.

pub mod postgres_access;
pub mod postgres_config;
pub mod postgres_event;
pub mod postgres_execution;
pub mod postgres_execution_log;
pub mod postgres_subscription;
pub mod postgres_workflow;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::domain::authorization::AccessRow;
use crate::domain::event::{Event, EventDelivery, EventId};
use crate::domain::execution::{Execution, ExecutionId, ExecutionStatus};
use crate::domain::execution_log::LogRow;
use crate::domain::repository::{
    AccessRepository, EventRepository, ExecutionLogRepository, ExecutionRepository, RepositoryError,
    SystemConfigRepository, WorkflowRepository,
};
use crate::domain::worker_pool::PoolPolicy;
use crate::domain::workflow::{WorkflowId, WorkflowRecord};

#[derive(Clone, Default)]
pub struct InMemoryWorkflowRepository {
    workflows: Arc<RwLock<HashMap<WorkflowId, WorkflowRecord>>>,
}

impl InMemoryWorkflowRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn save(&self, workflow: &WorkflowRecord) -> Result<(), RepositoryError> {
        self.workflows.write().unwrap().insert(workflow.id, workflow.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: WorkflowId) -> Result<Option<WorkflowRecord>, RepositoryError> {
        Ok(self.workflows.read().unwrap().get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<WorkflowRecord>, RepositoryError> {
        Ok(self.workflows.read().unwrap().values().find(|w| w.name == name).cloned())
    }

    async fn list_scheduled(&self) -> Result<Vec<WorkflowRecord>, RepositoryError> {
        Ok(self.workflows.read().unwrap().values().filter(|w| w.schedule.is_some()).cloned().collect())
    }

    async fn list_all(&self) -> Result<Vec<WorkflowRecord>, RepositoryError> {
        Ok(self.workflows.read().unwrap().values().cloned().collect())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryExecutionRepository {
    executions: Arc<RwLock<HashMap<ExecutionId, Execution>>>,
}

impl InMemoryExecutionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExecutionRepository for InMemoryExecutionRepository {
    async fn save(&self, execution: &Execution) -> Result<(), RepositoryError> {
        self.executions.write().unwrap().insert(execution.id, execution.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ExecutionId) -> Result<Option<Execution>, RepositoryError> {
        Ok(self.executions.read().unwrap().get(&id).cloned())
    }

    async fn find_by_workflow(&self, workflow_id: WorkflowId, limit: usize) -> Result<Vec<Execution>, RepositoryError> {
        let executions = self.executions.read().unwrap();
        let mut matching: Vec<Execution> = executions.values().filter(|e| e.workflow_id == workflow_id).cloned().collect();
        matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn find_stuck_candidates(&self, older_than_seconds: i64) -> Result<Vec<Execution>, RepositoryError> {
        let now = chrono::Utc::now();
        let executions = self.executions.read().unwrap();
        Ok(executions
            .values()
            .filter(|e| {
                matches!(e.status, ExecutionStatus::Running | ExecutionStatus::Cancelling)
                    && (now - e.started_at).num_seconds() >= older_than_seconds
            })
            .cloned()
            .collect())
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<Execution>, RepositoryError> {
        let executions = self.executions.read().unwrap();
        let mut all: Vec<Execution> = executions.values().cloned().collect();
        all.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all.truncate(limit);
        Ok(all)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryExecutionLogRepository {
    logs: Arc<RwLock<HashMap<ExecutionId, Vec<LogRow>>>>,
}

impl InMemoryExecutionLogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExecutionLogRepository for InMemoryExecutionLogRepository {
    async fn append(&self, row: &LogRow) -> Result<(), RepositoryError> {
        self.logs.write().unwrap().entry(row.execution_id).or_default().push(row.clone());
        Ok(())
    }

    async fn find_by_execution(&self, execution_id: ExecutionId) -> Result<Vec<LogRow>, RepositoryError> {
        Ok(self.logs.read().unwrap().get(&execution_id).cloned().unwrap_or_default())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryAccessRepository {
    rows: Arc<RwLock<HashMap<WorkflowId, Vec<AccessRow>>>>,
}

impl InMemoryAccessRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_for_workflow(&self, workflow_id: WorkflowId, rows: Vec<AccessRow>) {
        self.rows.write().unwrap().insert(workflow_id, rows);
    }
}

#[async_trait]
impl AccessRepository for InMemoryAccessRepository {
    async fn find_for_workflow(&self, workflow_id: WorkflowId) -> Result<Vec<AccessRow>, RepositoryError> {
        Ok(self.rows.read().unwrap().get(&workflow_id).cloned().unwrap_or_default())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryEventRepository {
    events: Arc<RwLock<HashMap<EventId, Event>>>,
    deliveries: Arc<RwLock<Vec<EventDelivery>>>,
}

impl InMemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn save_event(&self, event: &Event) -> Result<(), RepositoryError> {
        self.events.write().unwrap().insert(event.id, event.clone());
        Ok(())
    }

    async fn save_delivery(&self, delivery: &EventDelivery) -> Result<(), RepositoryError> {
        self.deliveries.write().unwrap().push(delivery.clone());
        Ok(())
    }

    async fn find_delivery(&self, event_id: EventId, workflow_id: WorkflowId) -> Result<Option<EventDelivery>, RepositoryError> {
        Ok(self
            .deliveries
            .read()
            .unwrap()
            .iter()
            .find(|d| d.event_id == event_id && d.workflow_id == workflow_id)
            .cloned())
    }
}

#[derive(Clone, Default)]
pub struct InMemorySystemConfigRepository {
    pool_policy: Arc<RwLock<Option<PoolPolicy>>>,
    webhook_secrets: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemorySystemConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_webhook_secret(&self, source_id: impl Into<String>, secret: impl Into<String>) {
        self.webhook_secrets.write().unwrap().insert(source_id.into(), secret.into());
    }
}

#[async_trait]
impl SystemConfigRepository for InMemorySystemConfigRepository {
    async fn get_worker_pool_config(&self) -> Result<Option<PoolPolicy>, RepositoryError> {
        Ok(*self.pool_policy.read().unwrap())
    }

    async fn save_worker_pool_config(&self, policy: &PoolPolicy) -> Result<(), RepositoryError> {
        *self.pool_policy.write().unwrap() = Some(*policy);
        Ok(())
    }

    async fn get_webhook_secret(&self, source_id: &str) -> Result<Option<String>, RepositoryError> {
        Ok(self.webhook_secrets.read().unwrap().get(source_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::TriggerSource;

    #[tokio::test]
    async fn execution_repository_round_trips() {
        let repo = InMemoryExecutionRepository::new();
        let exec = Execution::new(ExecutionId::new(), WorkflowId::new(), "demo", serde_json::json!({}), None, TriggerSource::User);
        repo.save(&exec).await.unwrap();
        let found = repo.find_by_id(exec.id).await.unwrap().unwrap();
        assert_eq!(found.id, exec.id);
    }

    #[tokio::test]
    async fn stuck_candidates_filters_by_status_and_age() {
        let repo = InMemoryExecutionRepository::new();
        let mut running = Execution::new(ExecutionId::new(), WorkflowId::new(), "demo", serde_json::json!({}), None, TriggerSource::User);
        running.start(None).unwrap();
        running.started_at = chrono::Utc::now() - chrono::Duration::seconds(120);
        repo.save(&running).await.unwrap();

        let candidates = repo.find_stuck_candidates(60).await.unwrap();
        assert_eq!(candidates.len(), 1);
    }
}
