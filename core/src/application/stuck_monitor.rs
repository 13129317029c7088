// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Stuck Execution Monitor (C11) — `spec.md` §4.11. Runs as a background
//! tick in the `bifrostd` daemon composition root.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::application::errors::OrchestrationError;
use crate::domain::execution::ExecutionStatus;
use crate::domain::repository::{ExecutionRepository, WorkerHeartbeatSource};

pub const DEFAULT_STUCK_GRACE_SECONDS: i64 = 60;
pub const CANCEL_GRACE_SECONDS: i64 = 30;

pub struct StuckExecutionMonitor {
    execution_repository: Arc<dyn ExecutionRepository>,
    heartbeat_source: Arc<dyn WorkerHeartbeatSource>,
    stuck_grace_seconds: i64,
}

impl StuckExecutionMonitor {
    pub fn new(
        execution_repository: Arc<dyn ExecutionRepository>,
        heartbeat_source: Arc<dyn WorkerHeartbeatSource>,
        stuck_grace_seconds: i64,
    ) -> Self {
        Self {
            execution_repository,
            heartbeat_source,
            stuck_grace_seconds,
        }
    }

    pub async fn tick(&self) -> Result<(), OrchestrationError> {
        let grace = self.stuck_grace_seconds.max(DEFAULT_STUCK_GRACE_SECONDS);
        let candidates = self.execution_repository.find_stuck_candidates(grace).await?;

        for mut execution in candidates {
            let alive = self
                .heartbeat_source
                .last_heartbeat_seconds_ago(execution.id)
                .await?
                .map(|age| age < grace)
                .unwrap_or(false);

            if alive {
                continue;
            }

            let now = Utc::now();
            let elapsed = (now - execution.started_at).num_seconds();
            let result = match execution.status {
                ExecutionStatus::Running if elapsed >= grace => execution.mark_stuck(),
                ExecutionStatus::Cancelling if elapsed >= CANCEL_GRACE_SECONDS => execution.mark_stuck(),
                _ => continue,
            };

            match result {
                Ok(()) => {
                    info!(execution_id = %execution.id, status = execution.status.as_str(), "stuck monitor transitioned execution");
                    self.execution_repository.save(&execution).await?;
                }
                Err(e) => {
                    warn!(execution_id = %execution.id, error = %e, "stuck monitor transition rejected, already terminal");
                }
            }
        }

        Ok(())
    }
}
