// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Event/Webhook Dispatcher (C10) — `spec.md` §4.10, adapter registry
//! supplement grounded in
//! `original_source/api/src/services/webhooks/registry.py`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::application::admission::{AdmissionGate, AdmissionRequest, WorkflowRef};
use crate::application::errors::OrchestrationError;
use crate::domain::authorization::Caller;
use crate::domain::event::{Event, EventDelivery, EventId, WebhookAdapter, WebhookVerificationError};
use crate::domain::execution::TriggerSource;
use crate::domain::repository::{EventRepository, SystemConfigRepository};
use crate::domain::workflow::WorkflowId;

/// Mapping a verified source to the workflow(s) subscribed to it. This is
/// the "EventSubscription" collaborator (`spec.md` §6's `event_subscriptions`
/// table); the core only needs the resolved workflow id.
#[async_trait::async_trait]
pub trait SubscriptionResolver: Send + Sync {
    async fn subscribed_workflows(&self, source_id: &str) -> Result<Vec<WorkflowId>, OrchestrationError>;
}

pub struct AdapterRegistry {
    adapters: HashMap<&'static str, Arc<dyn WebhookAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self { adapters: HashMap::new() }
    }

    pub fn register(&mut self, adapter: Arc<dyn WebhookAdapter>) {
        self.adapters.insert(adapter.name(), adapter);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn WebhookAdapter>> {
        self.adapters.get(name).cloned()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub struct WebhookDispatcher {
    adapters: AdapterRegistry,
    config_repository: Arc<dyn SystemConfigRepository>,
    event_repository: Arc<dyn EventRepository>,
    subscriptions: Arc<dyn SubscriptionResolver>,
    admission_gate: Arc<dyn AdmissionGate>,
}

impl WebhookDispatcher {
    pub fn new(
        adapters: AdapterRegistry,
        config_repository: Arc<dyn SystemConfigRepository>,
        event_repository: Arc<dyn EventRepository>,
        subscriptions: Arc<dyn SubscriptionResolver>,
        admission_gate: Arc<dyn AdmissionGate>,
    ) -> Self {
        Self {
            adapters,
            config_repository,
            event_repository,
            subscriptions,
            admission_gate,
        }
    }

    /// Handles one inbound webhook hit against `/api/hooks/{source_id}`.
    pub async fn handle_hook(
        &self,
        source_id: &str,
        adapter_name: &str,
        headers: &HashMap<String, String>,
        body: &[u8],
    ) -> Result<Vec<Uuid>, OrchestrationError> {
        let adapter = self
            .adapters
            .get(adapter_name)
            .ok_or_else(|| OrchestrationError::TransientInfrastructure(format!("unknown adapter '{adapter_name}'")))?;

        let secret = self
            .config_repository
            .get_webhook_secret(source_id)
            .await?
            .unwrap_or_default();

        let payload = adapter.verify(&secret, headers, body).map_err(|e| match e {
            WebhookVerificationError::MissingSignature | WebhookVerificationError::SignatureMismatch => {
                OrchestrationError::NotAuthorized
            }
            WebhookVerificationError::UnknownAdapter(name) => OrchestrationError::TransientInfrastructure(format!("unknown adapter '{name}'")),
        })?;

        let event = Event {
            id: EventId::new(),
            source_id: source_id.to_string(),
            adapter_name: adapter_name.to_string(),
            payload,
            received_at: chrono::Utc::now(),
        };
        self.event_repository.save_event(&event).await?;

        let workflows = self.subscriptions.subscribed_workflows(source_id).await?;
        let mut delivery_ids = Vec::with_capacity(workflows.len());

        for workflow_id in workflows {
            let delivery_id = Uuid::new_v4();
            let request = AdmissionRequest {
                workflow_ref: WorkflowRef::Id(workflow_id),
                parameters: event.payload.clone(),
                caller: Caller::system(),
                sync: false,
                execution_id: None,
                trigger: TriggerSource::Webhook,
            };

            let delivery = match self.admission_gate.admit(request).await {
                Ok(execution_id) => {
                    info!(%workflow_id, %execution_id, "webhook delivery admitted");
                    EventDelivery {
                        id: delivery_id,
                        event_id: event.id,
                        workflow_id,
                        execution_id: Some(execution_id),
                        delivered_at: chrono::Utc::now(),
                    }
                }
                Err(e) => {
                    warn!(%workflow_id, error = %e, "webhook delivery admission failed, will retry via backoff");
                    EventDelivery {
                        id: delivery_id,
                        event_id: event.id,
                        workflow_id,
                        execution_id: None,
                        delivered_at: chrono::Utc::now(),
                    }
                }
            };
            self.event_repository.save_delivery(&delivery).await?;
            delivery_ids.push(delivery_id);
        }

        Ok(delivery_ids)
    }
}
