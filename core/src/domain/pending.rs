// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Pending Execution (C2) — the ephemeral Redis record carrying full caller
//! context to the worker. Single-writer (Admission Gate or Worker),
//! single-reader (Worker), then deleted (`spec.md` §5).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::execution::{ExecutionId, TriggerSource};
use crate::domain::workflow::WorkflowId;

pub const DEFAULT_PENDING_TTL_SECONDS: u64 = 600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerContext {
    pub identity: Option<String>,
    pub org_id: Option<Uuid>,
    pub is_superuser: bool,
    pub is_api_key: bool,
    pub api_key_id: Option<Uuid>,
    pub roles: Vec<String>,
    pub trigger: TriggerSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingExecution {
    pub execution_id: ExecutionId,
    pub workflow_id: WorkflowId,
    pub parameters: serde_json::Value,
    pub caller: CallerContext,
    pub sync: bool,
    pub form_id: Option<Uuid>,
    pub code_b64: Option<String>,
}

impl PendingExecution {
    pub fn new(
        execution_id: ExecutionId,
        workflow_id: WorkflowId,
        parameters: serde_json::Value,
        caller: CallerContext,
        sync: bool,
    ) -> Self {
        Self {
            execution_id,
            workflow_id,
            parameters,
            caller,
            sync,
            form_id: None,
            code_b64: None,
        }
    }
}
