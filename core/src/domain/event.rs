// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Event/Webhook Dispatcher (C10). Inbound webhooks are verified by a
//! pluggable [`WebhookAdapter`] (supplemented feature, grounded in
//! `original_source/api/src/services/webhooks/registry.py`'s adapter
//! registry), then recorded as an [`Event`] and fan the fed execution trigger
//! out as an [`EventDelivery`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::execution::ExecutionId;
use crate::domain::workflow::WorkflowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

/// A verified inbound event from an external source (webhook, poll).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub source_id: String,
    pub adapter_name: String,
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

/// Delivery of an [`Event`] to a triggered workflow execution. `spec.md`
/// §3's Event Delivery Record: `(event_id, workflow_id)` unique, so a
/// retried webhook delivery cannot double-trigger a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDelivery {
    pub id: Uuid,
    pub event_id: EventId,
    pub workflow_id: WorkflowId,
    pub execution_id: Option<ExecutionId>,
    pub delivered_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum WebhookVerificationError {
    #[error("missing signature header")]
    MissingSignature,
    #[error("signature mismatch")]
    SignatureMismatch,
    #[error("unknown adapter '{0}'")]
    UnknownAdapter(String),
}

/// Verifies an inbound webhook request and extracts its payload. One
/// implementation per source type (`generic` HMAC, Slack, Stripe, ...),
/// looked up by name through `infrastructure::webhook_adapters::AdapterRegistry`,
/// mirroring the Python `registry.py`'s `register`/`get` pattern.
#[async_trait]
pub trait WebhookAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn verify(
        &self,
        secret: &str,
        headers: &std::collections::HashMap<String, String>,
        body: &[u8],
    ) -> Result<serde_json::Value, WebhookVerificationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_id_is_unique() {
        assert_ne!(EventId::new(), EventId::new());
    }
}
