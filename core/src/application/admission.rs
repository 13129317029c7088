// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Admission Gate (C1) use case — `spec.md` §4.1.
//!
//! Resolves workflow metadata, delegates to the Authorization Resolver (C7),
//! writes the Pending Execution (C2), updates the Queue Position Tracker
//! (C3), and hands a dispatch message to the Broker Producer (C4).

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::errors::OrchestrationError;
use crate::domain::authorization::{can_execute, AccessRow, Caller, EntityType};
use crate::domain::dispatch::DispatchMessage;
use crate::domain::execution::{Execution, ExecutionId, TriggerSource};
use crate::domain::pending::{CallerContext, PendingExecution};
use crate::domain::repository::{AccessRepository, ExecutionRepository, WorkflowRepository};
use crate::domain::workflow::WorkflowRecord;

#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    pub workflow_ref: WorkflowRef,
    pub parameters: serde_json::Value,
    pub caller: Caller,
    pub sync: bool,
    pub execution_id: Option<ExecutionId>,
    pub trigger: TriggerSource,
}

#[derive(Debug, Clone)]
pub enum WorkflowRef {
    Id(crate::domain::workflow::WorkflowId),
    Name(String),
}

/// Collaborators C1 hands work to once admission decides to proceed.
#[async_trait]
pub trait PendingStore: Send + Sync {
    async fn set_pending(&self, execution_id: ExecutionId, record: &PendingExecution, ttl_seconds: u64) -> Result<(), OrchestrationError>;
}

#[async_trait]
pub trait QueueTracker: Send + Sync {
    async fn add(&self, execution_id: ExecutionId) -> Result<u64, OrchestrationError>;
}

#[async_trait]
pub trait BrokerProducer: Send + Sync {
    async fn publish_dispatch(&self, message: &DispatchMessage) -> Result<(), OrchestrationError>;
}

#[async_trait]
pub trait AdmissionGate: Send + Sync {
    async fn admit(&self, request: AdmissionRequest) -> Result<ExecutionId, OrchestrationError>;
}

pub struct StandardAdmissionGate {
    workflow_repository: Arc<dyn WorkflowRepository>,
    access_repository: Arc<dyn AccessRepository>,
    execution_repository: Arc<dyn ExecutionRepository>,
    pending_store: Arc<dyn PendingStore>,
    queue_tracker: Arc<dyn QueueTracker>,
    broker: Arc<dyn BrokerProducer>,
}

impl StandardAdmissionGate {
    pub fn new(
        workflow_repository: Arc<dyn WorkflowRepository>,
        access_repository: Arc<dyn AccessRepository>,
        execution_repository: Arc<dyn ExecutionRepository>,
        pending_store: Arc<dyn PendingStore>,
        queue_tracker: Arc<dyn QueueTracker>,
        broker: Arc<dyn BrokerProducer>,
    ) -> Self {
        Self {
            workflow_repository,
            access_repository,
            execution_repository,
            pending_store,
            queue_tracker,
            broker,
        }
    }

    async fn resolve_workflow(&self, workflow_ref: &WorkflowRef) -> Result<WorkflowRecord, OrchestrationError> {
        let found = match workflow_ref {
            WorkflowRef::Id(id) => self.workflow_repository.find_by_id(*id).await?,
            WorkflowRef::Name(name) => self.workflow_repository.find_by_name(name).await?,
        };
        found.ok_or_else(|| {
            let label = match workflow_ref {
                WorkflowRef::Id(id) => id.to_string(),
                WorkflowRef::Name(name) => name.clone(),
            };
            OrchestrationError::WorkflowNotFound(label)
        })
    }
}

#[async_trait]
impl AdmissionGate for StandardAdmissionGate {
    async fn admit(&self, request: AdmissionRequest) -> Result<ExecutionId, OrchestrationError> {
        let workflow = self.resolve_workflow(&request.workflow_ref).await?;

        let access_rows: Vec<AccessRow> = self.access_repository.find_for_workflow(workflow.id).await?;
        let authorized = can_execute(&request.caller, &access_rows, |_entity_type: EntityType, _entity_id: Uuid| {
            // role assignment lookup is an external collaborator (`users`/`roles` tables);
            // the precomputed access rows already carry the roles actually required here.
            Vec::new()
        });
        if !authorized {
            return Err(OrchestrationError::NotAuthorized);
        }

        let execution_id = request.execution_id.unwrap_or_default();

        if request.sync {
            let mut execution = Execution::new(
                execution_id,
                workflow.id,
                workflow.name.clone(),
                request.parameters.clone(),
                request.caller.identity.clone(),
                request.trigger,
            );
            execution.organization_id = request.caller.org_id.or(workflow.organization_id);
            self.execution_repository.save(&execution).await?;
        }

        let caller_context = CallerContext {
            identity: request.caller.identity.clone(),
            org_id: request.caller.org_id,
            is_superuser: request.caller.is_superuser,
            is_api_key: request.caller.is_api_key,
            api_key_id: request.caller.api_key_id,
            roles: request.caller.roles.clone(),
            trigger: request.trigger,
        };
        let pending = PendingExecution::new(
            execution_id,
            workflow.id,
            request.parameters,
            caller_context,
            request.sync,
        );

        let pending_write = self
            .pending_store
            .set_pending(execution_id, &pending, crate::domain::pending::DEFAULT_PENDING_TTL_SECONDS)
            .await;
        let dispatch = DispatchMessage::new(execution_id, workflow.name.clone(), request.sync);
        let broker_publish = self.broker.publish_dispatch(&dispatch).await;

        if pending_write.is_err() && broker_publish.is_err() {
            return Err(OrchestrationError::AdmissionOverloaded);
        }
        pending_write?;
        broker_publish?;

        self.queue_tracker.add(execution_id).await?;

        Ok(execution_id)
    }
}
