// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::event::{Event, EventDelivery, EventId};
use crate::domain::repository::{EventRepository, RepositoryError};
use crate::domain::workflow::WorkflowId;

pub struct PostgresEventRepository {
    pool: PgPool,
}

impl PostgresEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PostgresEventRepository {
    async fn save_event(&self, event: &Event) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO events (id, source_id, adapter_name, payload, received_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(event.id.0)
        .bind(&event.source_id)
        .bind(&event.adapter_name)
        .bind(&event.payload)
        .bind(event.received_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(())
    }

    async fn save_delivery(&self, delivery: &EventDelivery) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO event_deliveries (id, event_id, workflow_id, execution_id, delivered_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (event_id, workflow_id) DO NOTHING
            "#,
        )
        .bind(delivery.id)
        .bind(delivery.event_id.0)
        .bind(delivery.workflow_id.0)
        .bind(delivery.execution_id.map(|id| id.0))
        .bind(delivery.delivered_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(())
    }

    async fn find_delivery(&self, event_id: EventId, workflow_id: WorkflowId) -> Result<Option<EventDelivery>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, event_id, workflow_id, execution_id, delivered_at \
             FROM event_deliveries WHERE event_id = $1 AND workflow_id = $2",
        )
        .bind(event_id.0)
        .bind(workflow_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(row.map(|row| EventDelivery {
            id: row.get("id"),
            event_id: EventId(row.get("event_id")),
            workflow_id: WorkflowId(row.get("workflow_id")),
            execution_id: row.get::<Option<uuid::Uuid>, _>("execution_id").map(crate::domain::execution::ExecutionId),
            delivered_at: row.get("delivered_at"),
        }))
    }
}
