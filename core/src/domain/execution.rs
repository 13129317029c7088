// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Execution aggregate root.
//!
//! An `Execution` is the durable record of a single workflow run, created at
//! admission (for sync triggers) or lazily by the worker (for async
//! triggers). Its status traverses a strict state machine; once a terminal
//! state is reached, no further transition is permitted (invariant 2 in
//! `spec.md` §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::workflow::WorkflowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub Uuid);

impl ExecutionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The trigger source that caused admission, carried through to the
/// durable record for audit/observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    User,
    ApiKey,
    Schedule,
    Webhook,
    AgentTool,
    CliSession,
    InlineScript,
}

/// Full execution status state machine (`spec.md` §3).
///
/// Transitions are gated by [`ExecutionStatus::can_transition_to`]:
/// `Pending -> Running -> {Success, Failed, Timeout, CompletedWithErrors,
/// Cancelling}`, `Cancelling -> {Cancelled, Stuck}`, `Running -> Stuck`
/// (worker found unresponsive). All other variants are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Success,
    Failed,
    Timeout,
    Stuck,
    CompletedWithErrors,
    Cancelling,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Success
                | ExecutionStatus::Failed
                | ExecutionStatus::Timeout
                | ExecutionStatus::Stuck
                | ExecutionStatus::CompletedWithErrors
                | ExecutionStatus::Cancelled
        )
    }

    /// Whether moving from `self` to `next` is a legal FSM edge.
    pub fn can_transition_to(&self, next: ExecutionStatus) -> bool {
        use ExecutionStatus::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (Pending, Running) => true,
            (Pending, Failed) => true, // AdmissionExpired, Unauthorized before start
            (Pending, Cancelled) => true, // cancel requested before worker picks it up
            (Running, Success | Failed | Timeout | CompletedWithErrors) => true,
            (Running, Cancelling) => true,
            (Running, Stuck) => true, // worker vanished mid-run
            (Cancelling, Cancelled | Stuck) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Timeout => "timeout",
            ExecutionStatus::Stuck => "stuck",
            ExecutionStatus::CompletedWithErrors => "completed_with_errors",
            ExecutionStatus::Cancelling => "cancelling",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => ExecutionStatus::Pending,
            "running" => ExecutionStatus::Running,
            "success" => ExecutionStatus::Success,
            "failed" => ExecutionStatus::Failed,
            "timeout" => ExecutionStatus::Timeout,
            "stuck" => ExecutionStatus::Stuck,
            "completed_with_errors" => ExecutionStatus::CompletedWithErrors,
            "cancelling" => ExecutionStatus::Cancelling,
            "cancelled" => ExecutionStatus::Cancelled,
            _ => return None,
        })
    }
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("execution {0} is already in a terminal state")]
    AlreadyTerminal(ExecutionId),
    #[error("illegal transition {from:?} -> {to:?} for execution {id}")]
    IllegalTransition {
        id: ExecutionId,
        from: ExecutionStatus,
        to: ExecutionStatus,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,
    pub workflow_id: WorkflowId,
    pub workflow_name: String,
    pub organization_id: Option<Uuid>,
    pub status: ExecutionStatus,
    pub parameters: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub error_type: Option<String>,
    pub duration_ms: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub executed_by: Option<String>,
    pub time_saved: Option<f64>,
    pub value: Option<f64>,
    pub api_key_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    pub form_id: Option<Uuid>,
    pub event_delivery_id: Option<Uuid>,
    pub trigger: TriggerSource,
}

impl Execution {
    /// Construct a new record in `Pending`, as written by the Admission Gate
    /// for sync triggers or lazily by the worker for async triggers.
    pub fn new(
        id: ExecutionId,
        workflow_id: WorkflowId,
        workflow_name: impl Into<String>,
        parameters: serde_json::Value,
        executed_by: Option<String>,
        trigger: TriggerSource,
    ) -> Self {
        Self {
            id,
            workflow_id,
            workflow_name: workflow_name.into(),
            organization_id: None,
            status: ExecutionStatus::Pending,
            parameters,
            result: None,
            error: None,
            error_type: None,
            duration_ms: None,
            started_at: Utc::now(),
            completed_at: None,
            executed_by,
            time_saved: None,
            value: None,
            api_key_id: None,
            session_id: None,
            form_id: None,
            event_delivery_id: None,
            trigger,
        }
    }

    fn transition(&mut self, next: ExecutionStatus) -> Result<(), ExecutionError> {
        if !self.status.can_transition_to(next) {
            if self.status.is_terminal() {
                return Err(ExecutionError::AlreadyTerminal(self.id));
            }
            return Err(ExecutionError::IllegalTransition {
                id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn start(&mut self, organization_id: Option<Uuid>) -> Result<(), ExecutionError> {
        self.organization_id = organization_id;
        self.started_at = Utc::now();
        self.transition(ExecutionStatus::Running)
    }

    pub fn request_cancel(&mut self) -> Result<(), ExecutionError> {
        self.transition(ExecutionStatus::Cancelling)
    }

    fn complete(&mut self, status: ExecutionStatus) -> Result<(), ExecutionError> {
        self.transition(status)?;
        self.completed_at = Some(Utc::now());
        self.duration_ms = Some((self.completed_at.unwrap() - self.started_at).num_milliseconds());
        Ok(())
    }

    pub fn succeed(&mut self, result: serde_json::Value) -> Result<(), ExecutionError> {
        self.result = Some(result);
        self.complete(ExecutionStatus::Success)
    }

    pub fn succeed_with_errors(&mut self, result: serde_json::Value) -> Result<(), ExecutionError> {
        self.result = Some(result);
        self.complete(ExecutionStatus::CompletedWithErrors)
    }

    pub fn fail(&mut self, error: impl Into<String>, error_type: impl Into<String>) -> Result<(), ExecutionError> {
        self.error = Some(error.into());
        self.error_type = Some(error_type.into());
        self.complete(ExecutionStatus::Failed)
    }

    pub fn time_out(&mut self) -> Result<(), ExecutionError> {
        self.error_type = Some("Timeout".to_string());
        self.complete(ExecutionStatus::Timeout)
    }

    pub fn cancel(&mut self) -> Result<(), ExecutionError> {
        self.complete(ExecutionStatus::Cancelled)
    }

    pub fn mark_stuck(&mut self) -> Result<(), ExecutionError> {
        self.error_type = Some("Stuck".to_string());
        self.complete(ExecutionStatus::Stuck)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_exec() -> Execution {
        Execution::new(
            ExecutionId::new(),
            WorkflowId::new(),
            "demo",
            serde_json::json!({}),
            Some("user@example.com".to_string()),
            TriggerSource::User,
        )
    }

    #[test]
    fn new_execution_is_pending() {
        let exec = new_exec();
        assert_eq!(exec.status, ExecutionStatus::Pending);
        assert!(exec.completed_at.is_none());
    }

    #[test]
    fn happy_path_to_success() {
        let mut exec = new_exec();
        exec.start(None).unwrap();
        assert_eq!(exec.status, ExecutionStatus::Running);
        exec.succeed(serde_json::json!({"ok": true})).unwrap();
        assert_eq!(exec.status, ExecutionStatus::Success);
        assert!(exec.completed_at.is_some());
        assert!(exec.duration_ms.unwrap() >= 0);
    }

    #[test]
    fn cancel_before_worker_start() {
        let mut exec = new_exec();
        exec.cancel().unwrap();
        assert_eq!(exec.status, ExecutionStatus::Cancelled);
    }

    #[test]
    fn cancel_during_run_via_cancelling() {
        let mut exec = new_exec();
        exec.start(None).unwrap();
        exec.request_cancel().unwrap();
        assert_eq!(exec.status, ExecutionStatus::Cancelling);
        exec.cancel().unwrap();
        assert_eq!(exec.status, ExecutionStatus::Cancelled);
    }

    #[test]
    fn cancelling_not_honored_becomes_stuck() {
        let mut exec = new_exec();
        exec.start(None).unwrap();
        exec.request_cancel().unwrap();
        exec.mark_stuck().unwrap();
        assert_eq!(exec.status, ExecutionStatus::Stuck);
    }

    #[test]
    fn no_transition_out_of_terminal_state() {
        let mut exec = new_exec();
        exec.start(None).unwrap();
        exec.succeed(serde_json::json!(null)).unwrap();
        let err = exec.start(None).unwrap_err();
        assert!(matches!(err, ExecutionError::AlreadyTerminal(_)));
    }

    #[test]
    fn no_running_to_pending_regression() {
        assert!(!ExecutionStatus::Running.can_transition_to(ExecutionStatus::Pending));
    }

    #[test]
    fn timeout_from_running() {
        let mut exec = new_exec();
        exec.start(None).unwrap();
        exec.time_out().unwrap();
        assert_eq!(exec.status, ExecutionStatus::Timeout);
        assert_eq!(exec.error_type.as_deref(), Some("Timeout"));
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            ExecutionStatus::Pending,
            ExecutionStatus::Running,
            ExecutionStatus::Success,
            ExecutionStatus::Failed,
            ExecutionStatus::Timeout,
            ExecutionStatus::Stuck,
            ExecutionStatus::CompletedWithErrors,
            ExecutionStatus::Cancelling,
            ExecutionStatus::Cancelled,
        ] {
            assert_eq!(ExecutionStatus::parse(status.as_str()), Some(status));
        }
    }
}
