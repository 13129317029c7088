// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Worker Runtime (C6) — `spec.md` §4.6. Runs inside the `bifrost-worker`
//! process (one execution at a time); the `bifrostd` daemon never imports
//! this module directly, only the `bifrost-worker` binary does.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::application::authorization::AuthorizationResolver;
use crate::application::errors::OrchestrationError;
use crate::application::log_fanout::LogFanout;
use crate::domain::authorization::Caller;
use crate::domain::dispatch::DispatchMessage;
use crate::domain::execution::{Execution, ExecutionId, TriggerSource};
use crate::domain::execution_log::{LogLevel, SequenceCounter};
use crate::domain::pending::PendingExecution;
use crate::domain::repository::{ExecutionRepository, WorkflowRepository};
use crate::domain::workflow::WorkflowRecord;

/// Reads/deletes the ephemeral Pending Execution (C2).
#[async_trait::async_trait]
pub trait PendingReader: Send + Sync {
    async fn get_pending(&self, execution_id: ExecutionId) -> Result<Option<PendingExecution>, OrchestrationError>;
    async fn delete_pending(&self, execution_id: ExecutionId) -> Result<(), OrchestrationError>;
}

#[async_trait::async_trait]
pub trait QueueTrackerRemove: Send + Sync {
    async fn remove(&self, execution_id: ExecutionId) -> Result<(), OrchestrationError>;
}

/// Cooperative cancellation poll: checks whether the durable record has
/// moved to `Cancelling` (`spec.md` §4.6 step 6's 1 s poll).
#[async_trait::async_trait]
pub trait CancellationWatcher: Send + Sync {
    async fn is_cancelling(&self, execution_id: ExecutionId) -> Result<bool, OrchestrationError>;
}

/// The pluggable scripting collaborator (`spec.md` §9's "dynamic code
/// loading"); `infrastructure::process_runtime` resolves the module source
/// via the module cache and hands it to a `ScriptRuntime` implementation.
#[async_trait::async_trait]
pub trait ScriptRuntime: Send + Sync {
    async fn run(
        &self,
        path: &str,
        function_name: &str,
        parameters: &serde_json::Value,
        logs: &mut dyn FnMut(LogLevel, String),
    ) -> Result<serde_json::Value, String>;
}

pub struct WorkerExecutionContext {
    pub workflow_repository: Arc<dyn WorkflowRepository>,
    pub execution_repository: Arc<dyn ExecutionRepository>,
    pub log_fanout: Arc<LogFanout>,
    pub pending_reader: Arc<dyn PendingReader>,
    pub queue_tracker: Arc<dyn QueueTrackerRemove>,
    pub cancellation_watcher: Arc<dyn CancellationWatcher>,
    pub authorization: Arc<dyn AuthorizationResolver>,
    pub script_runtime: Arc<dyn ScriptRuntime>,
    pub sync_result_ttl_seconds: u64,
}

/// Handles a single dispatch message end to end, implementing the eleven
/// ordered steps of `spec.md` §4.6. Returns `Ok(true)` when the caller
/// should ack the broker message.
pub async fn handle_dispatch(
    ctx: &WorkerExecutionContext,
    message: &DispatchMessage,
) -> Result<bool, OrchestrationError> {
    // Step 1: read Pending Execution; if missing, defer to durable state.
    let pending = match ctx.pending_reader.get_pending(message.execution_id).await? {
        Some(pending) => pending,
        None => {
            return match ctx.execution_repository.find_by_id(message.execution_id).await? {
                Some(existing) if existing.status.is_terminal() => Ok(true),
                Some(_) => {
                    // durable record exists but is not terminal and Pending vanished: TTL expired.
                    expire_admission(ctx, message.execution_id).await?;
                    Ok(true)
                }
                None => Ok(true),
            };
        }
    };

    // Step 2: resolve organization scope (invariant 5).
    let workflow = ctx
        .workflow_repository
        .find_by_id(pending.workflow_id)
        .await?
        .ok_or_else(|| OrchestrationError::WorkflowNotFound(pending.workflow_id.to_string()))?;
    let org_id = pending.caller.org_id.or(workflow.organization_id);

    // Step 3: ensure durable record exists and transition to Running.
    let mut execution = match ctx.execution_repository.find_by_id(message.execution_id).await? {
        Some(existing) => existing,
        None => Execution::new(
            message.execution_id,
            workflow.id,
            workflow.name.clone(),
            pending.parameters.clone(),
            pending.caller.identity.clone(),
            pending.caller.trigger,
        ),
    };
    execution.start(org_id).map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
    ctx.execution_repository.save(&execution).await?;

    // Step 4: authorization re-check.
    let caller = Caller {
        identity: pending.caller.identity.clone(),
        org_id,
        is_superuser: pending.caller.is_superuser,
        is_api_key: pending.caller.is_api_key,
        api_key_id: pending.caller.api_key_id,
        roles: pending.caller.roles.clone(),
    };
    if !ctx.authorization.is_authorized(workflow.id, &caller).await? {
        execution
            .fail("caller is not authorized", "Unauthorized")
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
        return finalize(ctx, message.execution_id, execution, pending.sync).await;
    }

    // Steps 5-10: resolve parameters, execute, classify outcome.
    let empty_params = serde_json::Map::new();
    let input_params = pending.parameters.as_object().unwrap_or(&empty_params);
    let resolved_params = match workflow.validate_parameters(input_params) {
        Ok(resolved) => resolved,
        Err(e) => {
            execution
                .fail(e.to_string(), "ValidationError")
                .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
            return finalize(ctx, message.execution_id, execution, pending.sync).await;
        }
    };

    run_workflow(ctx, &workflow, &mut execution, &resolved_params).await;

    finalize(ctx, message.execution_id, execution, pending.sync).await
}

async fn expire_admission(ctx: &WorkerExecutionContext, execution_id: ExecutionId) -> Result<(), OrchestrationError> {
    if let Some(mut execution) = ctx.execution_repository.find_by_id(execution_id).await? {
        if execution.status == crate::domain::execution::ExecutionStatus::Pending {
            let _ = execution.fail("pending record expired before dispatch", "AdmissionExpired");
            ctx.execution_repository.save(&execution).await?;
            if let Err(e) = ctx.log_fanout.publish_status(&execution).await {
                warn!(execution_id = %execution_id, error = %e, "failed to publish status update");
            }
        }
    }
    Ok(())
}

/// Runs the workflow, feeding each log line through a channel to a drain
/// task so the hot execution path never blocks on a DB write, while still
/// guaranteeing every line is appended (and fanned out) before this function
/// returns — no per-line fire-and-forget task survives past `finalize`.
async fn run_workflow(
    ctx: &WorkerExecutionContext,
    workflow: &WorkflowRecord,
    execution: &mut Execution,
    parameters: &serde_json::Value,
) {
    let mut sequence = SequenceCounter::new();
    let deadline = Instant::now() + Duration::from_secs(workflow.timeout_seconds);
    let mut error_log_count = 0u32;
    let execution_id = execution.id;

    let (log_tx, mut log_rx) = mpsc::unbounded_channel::<(i64, LogLevel, String)>();
    let log_fanout = ctx.log_fanout.clone();
    let log_drain = tokio::spawn(async move {
        while let Some((sequence, level, message)) = log_rx.recv().await {
            if let Err(e) = log_fanout.append_log(execution_id, sequence, level, message, serde_json::json!({})).await {
                error!(execution_id = %execution_id, error = %e, "failed to append execution log row");
            }
        }
    });

    {
        let mut emit = |level: LogLevel, message: String| {
            if level == LogLevel::Error {
                error_log_count += 1;
            }
            let _ = log_tx.send((sequence.next(), level, message));
        };

        let cancel_check = tokio::time::interval(Duration::from_secs(1));
        tokio::pin!(cancel_check);

        let run_future = ctx.script_runtime.run(&workflow.path, &workflow.function_name, parameters, &mut emit);
        tokio::pin!(run_future);

        loop {
            tokio::select! {
                result = &mut run_future => {
                    match result {
                        Ok(value) => {
                            if error_log_count > 0 {
                                let _ = execution.succeed_with_errors(value);
                            } else {
                                let _ = execution.succeed(value);
                            }
                        }
                        Err(message) => {
                            let _ = execution.fail(message, "UserFailure");
                        }
                    }
                    break;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    let _ = execution.time_out();
                    break;
                }
                _ = cancel_check.tick() => {
                    match ctx.cancellation_watcher.is_cancelling(execution_id).await {
                        Ok(true) => {
                            let _ = execution.cancel();
                            break;
                        }
                        Ok(false) => continue,
                        Err(e) => {
                            warn!(error = %e, "cancellation poll failed, continuing");
                        }
                    }
                }
            }
        }
        // `emit` (and its `log_tx` sender) drops here, closing the channel.
    }

    if let Err(e) = log_drain.await {
        error!(execution_id = %execution_id, error = %e, "log drain task panicked");
    }
}

async fn finalize(
    ctx: &WorkerExecutionContext,
    execution_id: ExecutionId,
    execution: Execution,
    sync: bool,
) -> Result<bool, OrchestrationError> {
    ctx.execution_repository.save(&execution).await?;
    ctx.queue_tracker.remove(execution_id).await?;
    if sync {
        if let Err(e) = ctx.log_fanout.deliver_sync_result(&execution, ctx.sync_result_ttl_seconds).await {
            warn!(execution_id = %execution_id, error = %e, "failed to push sync result to inbox");
        }
    }
    if let Err(e) = ctx.log_fanout.publish_status(&execution).await {
        warn!(execution_id = %execution_id, error = %e, "failed to publish status update");
    }
    ctx.pending_reader.delete_pending(execution_id).await?;
    info!(execution_id = %execution_id, status = execution.status.as_str(), "execution finalized");
    Ok(true)
}
