// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Dispatch message (C4) — the envelope published to the fanout exchange and
//! consumed by exactly one worker. Wire format is byte-exact with `spec.md`
//! §6: `{execution_id, workflow_name, code, sync}`, JSON, snake_case, no
//! `type` tag (the queue itself disambiguates). The worker resolves
//! `workflow_id` from the Pending Execution record, not from this message.

use serde::{Deserialize, Serialize};

use crate::domain::execution::ExecutionId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchMessage {
    pub execution_id: ExecutionId,
    pub workflow_name: String,
    pub code: Option<String>,
    pub sync: bool,
}

impl DispatchMessage {
    pub fn new(execution_id: ExecutionId, workflow_name: impl Into<String>, sync: bool) -> Self {
        Self {
            execution_id,
            workflow_name: workflow_name.into(),
            code: None,
            sync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let msg = DispatchMessage::new(ExecutionId::new(), "demo", true);
        let json = serde_json::to_string(&msg).unwrap();
        let back: DispatchMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn field_names_are_snake_case() {
        let msg = DispatchMessage::new(ExecutionId::new(), "demo", false);
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("workflow_name").is_some());
        assert!(json.get("execution_id").is_some());
        assert!(json.get("workflow_id").is_none());
    }
}
