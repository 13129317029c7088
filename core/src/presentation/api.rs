// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! HTTP surface (`spec.md` §6) over the application layer's use cases.
//! Runs inside the `bifrostd` daemon; `bifrost-worker` never imports this
//! module.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use futures::stream::Stream;
use serde_json::json;
use tokio_stream::StreamExt;
use tracing::warn;

use crate::application::admission::{AdmissionGate, AdmissionRequest, WorkflowRef};
use crate::application::errors::OrchestrationError;
use crate::application::pool_manager::WorkerPoolManager;
use crate::application::webhook_dispatcher::WebhookDispatcher;
use crate::domain::authorization::Caller;
use crate::domain::execution::{ExecutionId, TriggerSource};
use crate::domain::repository::{ExecutionLogRepository, ExecutionRepository};
use crate::domain::worker_pool::{PoolPolicy, WorkerId};
use crate::domain::workflow::WorkflowId;
use crate::infrastructure::redis_pubsub::blpop_result;
use crate::infrastructure::redis_queue::RedisQueueTracker;

pub struct AppState {
    pub admission_gate: Arc<dyn AdmissionGate>,
    pub execution_repository: Arc<dyn ExecutionRepository>,
    pub log_repository: Arc<dyn ExecutionLogRepository>,
    pub queue_tracker: Arc<RedisQueueTracker>,
    pub pool_manager: Arc<WorkerPoolManager>,
    pub webhook_dispatcher: Arc<WebhookDispatcher>,
    pub redis_client: redis::Client,
    pub sync_result_ttl_seconds: u64,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/executions", post(admit))
        .route("/executions/{id}", get(get_execution))
        .route("/executions/{id}/logs", get(get_logs))
        .route("/executions/{id}/updates", get(stream_updates))
        .route("/executions/{id}/cancel", post(cancel_execution))
        .route("/executions/{id}/sync_result", get(sync_result))
        .route("/queue/depth", get(queue_depth))
        .route("/queue/{id}/position", get(queue_position))
        .route("/admin/workers", get(list_workers))
        .route("/admin/workers/{id}/recycle", post(recycle_worker))
        .route("/admin/worker-pool-config", get(get_pool_config))
        .route("/admin/worker-pool-config", put(set_pool_config))
        .route("/api/hooks/{source_id}/{adapter_name}", post(webhook_hook))
        .with_state(state)
}

fn error_response(err: OrchestrationError) -> (axum::http::StatusCode, Json<serde_json::Value>) {
    use axum::http::StatusCode;
    let status = match err {
        OrchestrationError::NotAuthorized => StatusCode::FORBIDDEN,
        OrchestrationError::WorkflowNotFound(_) | OrchestrationError::ModuleNotFound(_) => StatusCode::NOT_FOUND,
        OrchestrationError::ValidationError(_) => StatusCode::BAD_REQUEST,
        OrchestrationError::AdmissionOverloaded => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() })))
}

fn parse_execution_id(raw: &str) -> Result<ExecutionId, (axum::http::StatusCode, Json<serde_json::Value>)> {
    ExecutionId::parse(raw).map_err(|_| {
        (axum::http::StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid execution id" })))
    })
}

#[derive(serde::Deserialize)]
pub struct CallerPayload {
    pub identity: Option<String>,
    pub org_id: Option<uuid::Uuid>,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub is_api_key: bool,
    pub api_key_id: Option<uuid::Uuid>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl From<CallerPayload> for Caller {
    fn from(p: CallerPayload) -> Self {
        Caller {
            identity: p.identity,
            org_id: p.org_id,
            is_superuser: p.is_superuser,
            is_api_key: p.is_api_key,
            api_key_id: p.api_key_id,
            roles: p.roles,
        }
    }
}

/// `POST admit(...)` (`spec.md` §4.1). `caller` is normally resolved by an
/// auth middleware (API key lookup, session cookie) upstream of this
/// handler; it is taken directly from the request body here because that
/// middleware is out of scope for the core crate.
#[derive(serde::Deserialize)]
pub struct AdmitRequestBody {
    pub workflow_id: Option<WorkflowId>,
    pub workflow_name: Option<String>,
    #[serde(default)]
    pub parameters: serde_json::Value,
    pub caller: CallerPayload,
    #[serde(default)]
    pub sync: bool,
    #[serde(default = "default_trigger")]
    pub trigger: TriggerSource,
}

fn default_trigger() -> TriggerSource {
    TriggerSource::User
}

async fn admit(State(state): State<Arc<AppState>>, Json(body): Json<AdmitRequestBody>) -> impl IntoResponse {
    let workflow_ref = match (body.workflow_id, body.workflow_name) {
        (Some(id), _) => WorkflowRef::Id(id),
        (None, Some(name)) => WorkflowRef::Name(name),
        (None, None) => {
            return (
                axum::http::StatusCode::BAD_REQUEST,
                Json(json!({ "error": "one of workflow_id or workflow_name is required" })),
            )
                .into_response();
        }
    };

    let request = AdmissionRequest {
        workflow_ref,
        parameters: body.parameters,
        caller: body.caller.into(),
        sync: body.sync,
        execution_id: None,
        trigger: body.trigger,
    };

    match state.admission_gate.admit(request).await {
        Ok(execution_id) => Json(json!({ "execution_id": execution_id.to_string() })).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// `GET execution(id)` (`spec.md` §6).
async fn get_execution(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> impl IntoResponse {
    let execution_id = match parse_execution_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp.into_response(),
    };
    match state.execution_repository.find_by_id(execution_id).await {
        Ok(Some(execution)) => Json(execution).into_response(),
        Ok(None) => (axum::http::StatusCode::NOT_FOUND, Json(json!({ "error": "execution not found" }))).into_response(),
        Err(e) => error_response(OrchestrationError::Repository(e)).into_response(),
    }
}

#[derive(serde::Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub since_sequence: i64,
}

/// `GET execution(id)/logs?since_sequence=N` (`spec.md` §6).
async fn get_logs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> impl IntoResponse {
    let execution_id = match parse_execution_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp.into_response(),
    };
    match state.log_repository.find_by_execution(execution_id).await {
        Ok(rows) => {
            let filtered: Vec<_> = rows.into_iter().filter(|r| r.sequence > query.since_sequence).collect();
            Json(filtered).into_response()
        }
        Err(e) => error_response(OrchestrationError::Repository(e)).into_response(),
    }
}

/// `SUBSCRIBE updates(id)` (`spec.md` §6) over Server-Sent Events. Opens a
/// dedicated Redis pub/sub connection per client, forwarding every
/// `UpdateEvent` until the connection closes or the channel errors.
async fn stream_updates(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> impl IntoResponse {
    let execution_id = match parse_execution_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp.into_response(),
    };

    let pubsub = match crate::infrastructure::redis_pubsub::subscribe_updates(&state.redis_client, execution_id).await {
        Ok(p) => p,
        Err(e) => {
            return error_response(OrchestrationError::TransientInfrastructure(e.to_string())).into_response();
        }
    };

    let stream: Pin<Box<dyn Stream<Item = Result<SseEvent, axum::Error>> + Send>> =
        Box::pin(pubsub.into_on_message().map(|msg| {
            let payload: String = msg.get_payload().unwrap_or_default();
            Ok(SseEvent::default().data(payload))
        }));

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

/// `POST cancel(id)` (`spec.md` §6): writes `Cancelling`. The worker
/// runtime's 1 s cancellation poll (`application::worker_runtime`) picks
/// this up and transitions the execution the rest of the way.
async fn cancel_execution(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> impl IntoResponse {
    let execution_id = match parse_execution_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp.into_response(),
    };

    let mut execution = match state.execution_repository.find_by_id(execution_id).await {
        Ok(Some(e)) => e,
        Ok(None) => {
            return (axum::http::StatusCode::NOT_FOUND, Json(json!({ "error": "execution not found" }))).into_response();
        }
        Err(e) => return error_response(OrchestrationError::Repository(e)).into_response(),
    };

    if let Err(e) = execution.request_cancel() {
        return (axum::http::StatusCode::CONFLICT, Json(json!({ "error": e.to_string() }))).into_response();
    }

    if let Err(e) = state.execution_repository.save(&execution).await {
        return error_response(OrchestrationError::Repository(e)).into_response();
    }

    Json(json!({ "status": execution.status.as_str() })).into_response()
}

#[derive(serde::Deserialize)]
pub struct SyncResultQuery {
    #[serde(default = "default_deadline_seconds")]
    pub deadline_seconds: u64,
}

fn default_deadline_seconds() -> u64 {
    30
}

/// `BLPOP sync_result(id, deadline)` (`spec.md` §6). Used by sync callers
/// (`TriggerSource::CliSession`, session-scoped requests) who block on the
/// Result Inbox instead of polling `GET execution(id)`.
async fn sync_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<SyncResultQuery>,
) -> impl IntoResponse {
    let execution_id = match parse_execution_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp.into_response(),
    };

    match blpop_result(&state.redis_client, execution_id, query.deadline_seconds).await {
        Ok(Some(execution)) => Json(execution).into_response(),
        Ok(None) => (axum::http::StatusCode::REQUEST_TIMEOUT, Json(json!({ "error": "deadline exceeded" }))).into_response(),
        Err(e) => error_response(OrchestrationError::TransientInfrastructure(e.to_string())).into_response(),
    }
}

/// `GET queue/depth` (`spec.md` §6).
async fn queue_depth(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.queue_tracker.depth().await {
        Ok(depth) => Json(json!({ "depth": depth })).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// `GET queue/position(id)` (`spec.md` §6).
async fn queue_position(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> impl IntoResponse {
    let execution_id = match parse_execution_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp.into_response(),
    };
    match state.queue_tracker.position(execution_id).await {
        Ok(position) => Json(json!({ "position": position })).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// `GET workers` (`spec.md` §6, admin only — auth is an upstream concern).
async fn list_workers(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.pool_manager.slots())
}

/// `POST worker/recycle(id)` (`spec.md` §6, admin only).
async fn recycle_worker(State(state): State<Arc<AppState>>, Path(id): Path<u32>) -> impl IntoResponse {
    match state.pool_manager.recycle(WorkerId(id)).await {
        Ok(()) => Json(json!({ "status": "recycled" })).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// Worker pool sizing config (supplemented admin surface, grounded in
/// `original_source/api/src/services/worker_pool_config_service.py`).
async fn get_pool_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.pool_manager.policy())
}

#[derive(serde::Deserialize)]
pub struct PoolConfigBody {
    pub min_workers: u32,
    pub max_workers: u32,
    pub worker_memory_threshold_mb: u64,
}

async fn set_pool_config(State(state): State<Arc<AppState>>, Json(body): Json<PoolConfigBody>) -> impl IntoResponse {
    let policy = match PoolPolicy::validated(body.min_workers, body.max_workers, body.worker_memory_threshold_mb) {
        Ok(p) => p,
        Err(e) => {
            return (axum::http::StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response();
        }
    };
    match state.pool_manager.set_policy(policy).await {
        Ok(()) => Json(policy).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// `/api/hooks/{source_id}/{adapter_name}` — inbound webhook ingress
/// (`application::webhook_dispatcher::WebhookDispatcher`).
async fn webhook_hook(
    State(state): State<Arc<AppState>>,
    Path((source_id, adapter_name)): Path<(String, String)>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    let header_map: HashMap<String, String> = headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_lowercase(), v.to_string())))
        .collect();

    match state.webhook_dispatcher.handle_hook(&source_id, &adapter_name, &header_map, &body).await {
        Ok(delivery_ids) => {
            Json(json!({ "delivery_ids": delivery_ids.into_iter().map(|id| id.to_string()).collect::<Vec<_>>() }))
                .into_response()
        }
        Err(e) => error_response(e).into_response(),
    }
}
