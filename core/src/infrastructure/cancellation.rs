// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! `CancellationWatcher` (`spec.md` §4.6 step 6's 1 s poll) backed directly
//! by the durable Execution Record, so a worker observes a cancel request
//! the moment `POST cancel(id)` writes `Cancelling`.

use std::sync::Arc;

use crate::application::errors::OrchestrationError;
use crate::application::worker_runtime::CancellationWatcher;
use crate::domain::execution::{ExecutionId, ExecutionStatus};
use crate::domain::repository::ExecutionRepository;

pub struct RepositoryCancellationWatcher {
    execution_repository: Arc<dyn ExecutionRepository>,
}

impl RepositoryCancellationWatcher {
    pub fn new(execution_repository: Arc<dyn ExecutionRepository>) -> Self {
        Self { execution_repository }
    }
}

#[async_trait::async_trait]
impl CancellationWatcher for RepositoryCancellationWatcher {
    async fn is_cancelling(&self, execution_id: ExecutionId) -> Result<bool, OrchestrationError> {
        let found = self.execution_repository.find_by_id(execution_id).await?;
        Ok(matches!(found.map(|e| e.status), Some(ExecutionStatus::Cancelling)))
    }
}
