// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! End-to-end round trip across the Admission Gate (C1) and the Worker
//! Runtime (C6), wired against the in-memory repository doubles and local
//! fakes for the Redis/AMQP-backed collaborators, so the full admit ->
//! dispatch -> terminal-state path exercises real use-case code.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bifrost_orchestrator_core::application::admission::{
    AdmissionGate, AdmissionRequest, BrokerProducer, PendingStore, QueueTracker, StandardAdmissionGate, WorkflowRef,
};
use bifrost_orchestrator_core::application::authorization::AuthorizationResolver;
use bifrost_orchestrator_core::application::errors::OrchestrationError;
use bifrost_orchestrator_core::application::log_fanout::{LogFanout, ResultInbox, UpdateChannel};
use bifrost_orchestrator_core::application::worker_runtime::{
    handle_dispatch, CancellationWatcher, PendingReader, QueueTrackerRemove, ScriptRuntime, WorkerExecutionContext,
};
use bifrost_orchestrator_core::domain::authorization::Caller;
use bifrost_orchestrator_core::domain::dispatch::DispatchMessage;
use bifrost_orchestrator_core::domain::execution::{Execution, ExecutionId, ExecutionStatus, TriggerSource};
use bifrost_orchestrator_core::domain::execution_log::{LogLevel, UpdateEvent};
use bifrost_orchestrator_core::domain::pending::PendingExecution;
use bifrost_orchestrator_core::domain::repository::WorkflowRepository;
use bifrost_orchestrator_core::domain::workflow::{ExecutionMode, WorkflowId, WorkflowRecord, WorkflowType};
use bifrost_orchestrator_core::infrastructure::repositories::{
    InMemoryAccessRepository, InMemoryExecutionLogRepository, InMemoryExecutionRepository, InMemoryWorkflowRepository,
};

struct FakePendingStore {
    records: Mutex<std::collections::HashMap<ExecutionId, PendingExecution>>,
}

impl FakePendingStore {
    fn new() -> Self {
        Self { records: Mutex::new(std::collections::HashMap::new()) }
    }
}

#[async_trait]
impl PendingStore for FakePendingStore {
    async fn set_pending(&self, id: ExecutionId, record: &PendingExecution, _ttl: u64) -> Result<(), OrchestrationError> {
        self.records.lock().unwrap().insert(id, record.clone());
        Ok(())
    }
}

#[async_trait]
impl PendingReader for FakePendingStore {
    async fn get_pending(&self, id: ExecutionId) -> Result<Option<PendingExecution>, OrchestrationError> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    async fn delete_pending(&self, id: ExecutionId) -> Result<(), OrchestrationError> {
        self.records.lock().unwrap().remove(&id);
        Ok(())
    }
}

struct FakeQueueTracker {
    depth: Mutex<u64>,
}

#[async_trait]
impl QueueTracker for FakeQueueTracker {
    async fn add(&self, _id: ExecutionId) -> Result<u64, OrchestrationError> {
        let mut depth = self.depth.lock().unwrap();
        *depth += 1;
        Ok(*depth)
    }
}

#[async_trait]
impl QueueTrackerRemove for FakeQueueTracker {
    async fn remove(&self, _id: ExecutionId) -> Result<(), OrchestrationError> {
        let mut depth = self.depth.lock().unwrap();
        *depth = depth.saturating_sub(1);
        Ok(())
    }
}

struct FakeBroker {
    published: Mutex<Vec<DispatchMessage>>,
}

#[async_trait]
impl BrokerProducer for FakeBroker {
    async fn publish_dispatch(&self, message: &DispatchMessage) -> Result<(), OrchestrationError> {
        self.published.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct AllowAllAuthorization;

#[async_trait]
impl AuthorizationResolver for AllowAllAuthorization {
    async fn is_authorized(
        &self,
        _workflow_id: WorkflowId,
        _caller: &Caller,
    ) -> Result<bool, bifrost_orchestrator_core::domain::repository::RepositoryError> {
        Ok(true)
    }
}

struct NeverCancelling;

#[async_trait]
impl CancellationWatcher for NeverCancelling {
    async fn is_cancelling(&self, _id: ExecutionId) -> Result<bool, OrchestrationError> {
        Ok(false)
    }
}

struct EchoingScriptRuntime;

#[async_trait]
impl ScriptRuntime for EchoingScriptRuntime {
    async fn run(
        &self,
        _path: &str,
        _function_name: &str,
        parameters: &serde_json::Value,
        logs: &mut dyn FnMut(LogLevel, String),
    ) -> Result<serde_json::Value, String> {
        logs(LogLevel::Info, "running demo workflow".to_string());
        Ok(parameters.clone())
    }
}

struct RecordingUpdateChannel {
    events: Mutex<Vec<UpdateEvent>>,
}

#[async_trait]
impl UpdateChannel for RecordingUpdateChannel {
    async fn publish(&self, _execution_id: ExecutionId, event: UpdateEvent) -> Result<(), OrchestrationError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

struct RecordingResultInbox {
    delivered: Mutex<Vec<ExecutionId>>,
}

#[async_trait]
impl ResultInbox for RecordingResultInbox {
    async fn push(&self, execution_id: ExecutionId, _execution: &Execution, _ttl_seconds: u64) -> Result<(), OrchestrationError> {
        self.delivered.lock().unwrap().push(execution_id);
        Ok(())
    }
}

fn demo_workflow() -> WorkflowRecord {
    WorkflowRecord {
        id: WorkflowId::new(),
        name: "demo".to_string(),
        function_name: "run".to_string(),
        path: "workflows/demo.py".to_string(),
        workflow_type: WorkflowType::Workflow,
        parameters_schema: vec![],
        schedule: None,
        timeout_seconds: 30,
        execution_mode: ExecutionMode::Async,
        endpoint_enabled: true,
        allowed_methods: vec!["POST".to_string()],
        organization_id: None,
        time_saved: None,
        value: None,
        api_key_hash: None,
        is_active: true,
    }
}

#[tokio::test]
async fn admission_to_terminal_state_round_trip() {
    let workflow_repository = Arc::new(InMemoryWorkflowRepository::new());
    let workflow = demo_workflow();
    workflow_repository.save(&workflow).await.unwrap();

    let access_repository = Arc::new(InMemoryAccessRepository::new());
    let execution_repository = Arc::new(InMemoryExecutionRepository::new());
    let log_repository = Arc::new(InMemoryExecutionLogRepository::new());
    let pending_store = Arc::new(FakePendingStore::new());
    let queue_tracker = Arc::new(FakeQueueTracker { depth: Mutex::new(0) });
    let broker = Arc::new(FakeBroker { published: Mutex::new(Vec::new()) });

    let admission_gate = StandardAdmissionGate::new(
        workflow_repository.clone(),
        access_repository,
        execution_repository.clone(),
        pending_store.clone(),
        queue_tracker.clone(),
        broker.clone(),
    );

    let request = AdmissionRequest {
        workflow_ref: WorkflowRef::Name("demo".to_string()),
        parameters: serde_json::json!({"greeting": "hello"}),
        caller: Caller::system(),
        sync: false,
        execution_id: None,
        trigger: TriggerSource::User,
    };

    let execution_id = admission_gate.admit(request).await.unwrap();
    assert_eq!(queue_tracker.depth.lock().unwrap().clone(), 1);

    let dispatch_message = broker.published.lock().unwrap().last().cloned().unwrap();
    assert_eq!(dispatch_message.execution_id, execution_id);

    let update_channel = Arc::new(RecordingUpdateChannel { events: Mutex::new(Vec::new()) });
    let result_inbox = Arc::new(RecordingResultInbox { delivered: Mutex::new(Vec::new()) });
    let log_fanout = Arc::new(LogFanout::new(log_repository, update_channel.clone(), result_inbox.clone()));
    let ctx = WorkerExecutionContext {
        workflow_repository,
        execution_repository: execution_repository.clone(),
        log_fanout,
        pending_reader: pending_store.clone(),
        queue_tracker: queue_tracker.clone(),
        cancellation_watcher: Arc::new(NeverCancelling),
        authorization: Arc::new(AllowAllAuthorization),
        script_runtime: Arc::new(EchoingScriptRuntime),
        sync_result_ttl_seconds: 300,
    };

    let acked = handle_dispatch(&ctx, &dispatch_message).await.unwrap();
    assert!(acked);

    let final_execution = execution_repository.find_by_id(execution_id).await.unwrap().unwrap();
    assert_eq!(final_execution.status, ExecutionStatus::Success);
    assert_eq!(final_execution.result, Some(serde_json::json!({"greeting": "hello"})));

    assert!(pending_store.get_pending(execution_id).await.unwrap().is_none());
    assert_eq!(*queue_tracker.depth.lock().unwrap(), 0);
    assert!(result_inbox.delivered.lock().unwrap().is_empty(), "async admission must not deliver a sync result");
    assert!(matches!(
        update_channel.events.lock().unwrap().last(),
        Some(UpdateEvent::Status { status: ExecutionStatus::Success, .. })
    ));
}

#[tokio::test]
async fn sync_admission_delivers_result_to_inbox() {
    let workflow_repository = Arc::new(InMemoryWorkflowRepository::new());
    let workflow = demo_workflow();
    workflow_repository.save(&workflow).await.unwrap();

    let access_repository = Arc::new(InMemoryAccessRepository::new());
    let execution_repository = Arc::new(InMemoryExecutionRepository::new());
    let log_repository = Arc::new(InMemoryExecutionLogRepository::new());
    let pending_store = Arc::new(FakePendingStore::new());
    let queue_tracker = Arc::new(FakeQueueTracker { depth: Mutex::new(0) });
    let broker = Arc::new(FakeBroker { published: Mutex::new(Vec::new()) });

    let admission_gate = StandardAdmissionGate::new(
        workflow_repository.clone(),
        access_repository,
        execution_repository.clone(),
        pending_store.clone(),
        queue_tracker.clone(),
        broker.clone(),
    );

    let request = AdmissionRequest {
        workflow_ref: WorkflowRef::Name("demo".to_string()),
        parameters: serde_json::json!({"greeting": "hello"}),
        caller: Caller::system(),
        sync: true,
        execution_id: None,
        trigger: TriggerSource::User,
    };

    let execution_id = admission_gate.admit(request).await.unwrap();
    let dispatch_message = broker.published.lock().unwrap().last().cloned().unwrap();

    let update_channel = Arc::new(RecordingUpdateChannel { events: Mutex::new(Vec::new()) });
    let result_inbox = Arc::new(RecordingResultInbox { delivered: Mutex::new(Vec::new()) });
    let log_fanout = Arc::new(LogFanout::new(log_repository, update_channel, result_inbox.clone()));
    let ctx = WorkerExecutionContext {
        workflow_repository,
        execution_repository,
        log_fanout,
        pending_reader: pending_store,
        queue_tracker,
        cancellation_watcher: Arc::new(NeverCancelling),
        authorization: Arc::new(AllowAllAuthorization),
        script_runtime: Arc::new(EchoingScriptRuntime),
        sync_result_ttl_seconds: 120,
    };

    // a plain API-triggered sync caller never sets `session_id`; only
    // `PendingExecution::sync` (threaded through from admission) should gate delivery.
    let acked = handle_dispatch(&ctx, &dispatch_message).await.unwrap();
    assert!(acked);
    assert_eq!(result_inbox.delivered.lock().unwrap().as_slice(), [execution_id]);
}

#[tokio::test]
async fn unknown_workflow_name_is_rejected_before_dispatch() {
    let workflow_repository = Arc::new(InMemoryWorkflowRepository::new());
    let access_repository = Arc::new(InMemoryAccessRepository::new());
    let execution_repository = Arc::new(InMemoryExecutionRepository::new());
    let pending_store = Arc::new(FakePendingStore::new());
    let queue_tracker = Arc::new(FakeQueueTracker { depth: Mutex::new(0) });
    let broker = Arc::new(FakeBroker { published: Mutex::new(Vec::new()) });

    let admission_gate = StandardAdmissionGate::new(
        workflow_repository,
        access_repository,
        execution_repository,
        pending_store,
        queue_tracker,
        broker,
    );

    let request = AdmissionRequest {
        workflow_ref: WorkflowRef::Name("does-not-exist".to_string()),
        parameters: serde_json::json!({}),
        caller: Caller::system(),
        sync: false,
        execution_id: None,
        trigger: TriggerSource::User,
    };

    let err = admission_gate.admit(request).await.unwrap_err();
    assert!(matches!(err, OrchestrationError::WorkflowNotFound(_)));
}
