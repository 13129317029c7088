// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Authorization Resolver (C7) use-case wrapper. The decision logic itself
//! is the pure `domain::authorization::can_execute`; this module is the
//! collaborator-fetching shell the worker runtime re-checks against at
//! step 4 of `spec.md` §4.6.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::authorization::{can_execute, Caller};
use crate::domain::repository::AccessRepository;
use crate::domain::workflow::WorkflowId;

#[async_trait]
pub trait AuthorizationResolver: Send + Sync {
    async fn is_authorized(&self, workflow_id: WorkflowId, caller: &Caller) -> Result<bool, crate::domain::repository::RepositoryError>;
}

pub struct StandardAuthorizationResolver {
    access_repository: Arc<dyn AccessRepository>,
}

impl StandardAuthorizationResolver {
    pub fn new(access_repository: Arc<dyn AccessRepository>) -> Self {
        Self { access_repository }
    }
}

#[async_trait]
impl AuthorizationResolver for StandardAuthorizationResolver {
    async fn is_authorized(&self, workflow_id: WorkflowId, caller: &Caller) -> Result<bool, crate::domain::repository::RepositoryError> {
        let rows = self.access_repository.find_for_workflow(workflow_id).await?;
        Ok(can_execute(caller, &rows, |_, _| Vec::new()))
    }
}
