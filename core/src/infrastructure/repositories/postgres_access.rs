// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::authorization::{AccessLevel, AccessRow, EntityType};
use crate::domain::repository::{AccessRepository, RepositoryError};
use crate::domain::workflow::WorkflowId;

pub struct PostgresAccessRepository {
    pool: PgPool,
}

impl PostgresAccessRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_access(row: PgRow) -> Result<AccessRow, RepositoryError> {
    let entity_type_str: String = row.get("entity_type");
    let entity_type = match entity_type_str.as_str() {
        "app" => EntityType::App,
        _ => EntityType::Form,
    };
    let access_level_str: String = row.get("access_level");
    let access_level = match access_level_str.as_str() {
        "role_based" => AccessLevel::RoleBased,
        _ => AccessLevel::Authenticated,
    };

    Ok(AccessRow {
        workflow_id: WorkflowId(row.get("workflow_id")),
        entity_type,
        entity_id: row.get("entity_id"),
        access_level,
        organization_id: row.get("organization_id"),
    })
}

#[async_trait]
impl AccessRepository for PostgresAccessRepository {
    async fn find_for_workflow(&self, workflow_id: WorkflowId) -> Result<Vec<AccessRow>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT workflow_id, entity_type, entity_id, access_level, organization_id \
             FROM workflow_access WHERE workflow_id = $1",
        )
        .bind(workflow_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.into_iter().map(row_to_access).collect()
    }
}
