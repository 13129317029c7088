// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Scheduler (C9) — `spec.md` §4.9. Runs as a background tick in the
//! `bifrostd` daemon (`cli`'s composition root), not as an HTTP handler.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use cron::Schedule;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::application::admission::{AdmissionGate, AdmissionRequest, WorkflowRef};
use crate::application::errors::OrchestrationError;
use crate::domain::authorization::Caller;
use crate::domain::execution::TriggerSource;
use crate::domain::repository::WorkflowRepository;
use crate::domain::schedule::{is_interval_too_short, CronState};
use crate::domain::workflow::WorkflowId;

pub struct Scheduler {
    workflow_repository: Arc<dyn WorkflowRepository>,
    admission_gate: Arc<dyn AdmissionGate>,
    state: Mutex<HashMap<WorkflowId, CronState>>,
}

impl Scheduler {
    pub fn new(workflow_repository: Arc<dyn WorkflowRepository>, admission_gate: Arc<dyn AdmissionGate>) -> Self {
        Self {
            workflow_repository,
            admission_gate,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// One tick: scan active, scheduled workflows and fire any that are
    /// due. Submitted in stable order by `(workflow.id, next_due_at)`.
    pub async fn tick(&self) -> Result<(), OrchestrationError> {
        let workflows = self.workflow_repository.list_scheduled().await?;
        let now = Utc::now();
        let mut due: Vec<(WorkflowId, chrono::DateTime<Utc>)> = Vec::new();

        for workflow in &workflows {
            let Some(cron_expr) = &workflow.schedule else { continue };
            let schedule = match Schedule::from_str(cron_expr) {
                Ok(s) => s,
                Err(e) => {
                    warn!(workflow_id = %workflow.id, error = %e, "invalid cron expression, skipping");
                    continue;
                }
            };

            let mut upcoming = schedule.upcoming(Utc);
            if let (Some(first), Some(second)) = (upcoming.next(), upcoming.next()) {
                if is_interval_too_short(first, second) {
                    warn!(workflow_id = %workflow.id, "cron interval under 5 minutes");
                }
            }

            let mut state_map = self.state.lock();
            let state = state_map.entry(workflow.id).or_insert_with(|| CronState::new(workflow.id));
            if state.next_due_at.is_none() {
                state.next_due_at = schedule.after(&state.last_fired_at.unwrap_or(now)).next();
            }
            if state.is_due(now) {
                due.push((workflow.id, state.next_due_at.unwrap_or(now)));
            }
        }

        due.sort_by(|a, b| (a.0 .0, a.1).cmp(&(b.0 .0, b.1)));

        for (workflow_id, _) in due {
            let Some(workflow) = workflows.iter().find(|w| w.id == workflow_id) else { continue };
            let request = AdmissionRequest {
                workflow_ref: WorkflowRef::Id(workflow_id),
                parameters: serde_json::json!({}),
                caller: Caller::system(),
                sync: false,
                execution_id: None,
                trigger: TriggerSource::Schedule,
            };
            match self.admission_gate.admit(request).await {
                Ok(execution_id) => {
                    info!(workflow_id = %workflow_id, workflow_name = %workflow.name, %execution_id, "scheduled execution admitted");
                    if let Ok(schedule) = Schedule::from_str(workflow.schedule.as_deref().unwrap_or("")) {
                        let next_due_at = schedule.after(&now).next();
                        let mut state_map = self.state.lock();
                        if let Some(state) = state_map.get_mut(&workflow_id) {
                            state.fired(now, next_due_at.unwrap_or(now));
                        }
                    }
                }
                Err(e) => {
                    warn!(workflow_id = %workflow_id, error = %e, "scheduled admission failed");
                }
            }
        }

        Ok(())
    }
}
