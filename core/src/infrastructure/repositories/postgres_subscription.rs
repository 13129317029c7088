// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! `event_subscriptions` lookup (`spec.md` §6) backing
//! `application::webhook_dispatcher::SubscriptionResolver`.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::application::errors::OrchestrationError;
use crate::application::webhook_dispatcher::SubscriptionResolver;
use crate::domain::workflow::WorkflowId;

pub struct PostgresSubscriptionResolver {
    pool: PgPool,
}

impl PostgresSubscriptionResolver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionResolver for PostgresSubscriptionResolver {
    async fn subscribed_workflows(&self, source_id: &str) -> Result<Vec<WorkflowId>, OrchestrationError> {
        let rows = sqlx::query("SELECT workflow_id FROM event_subscriptions WHERE source_id = $1")
            .bind(source_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;

        Ok(rows.into_iter().map(|row| WorkflowId(row.get("workflow_id"))).collect())
    }
}
