// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::repository::{RepositoryError, WorkflowRepository};
use crate::domain::workflow::{ExecutionMode, ParameterSpec, WorkflowId, WorkflowRecord, WorkflowType};

pub struct PostgresWorkflowRepository {
    pool: PgPool,
}

impl PostgresWorkflowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "id, name, function_name, path, workflow_type, parameters_schema, schedule, \
     timeout_seconds, execution_mode, endpoint_enabled, allowed_methods, organization_id, time_saved, \
     value, api_key_hash, is_active";

fn row_to_workflow(row: PgRow) -> Result<WorkflowRecord, RepositoryError> {
    let workflow_type_str: String = row.get("workflow_type");
    let workflow_type = match workflow_type_str.as_str() {
        "data_provider" => WorkflowType::DataProvider,
        _ => WorkflowType::Workflow,
    };
    let execution_mode_str: String = row.get("execution_mode");
    let execution_mode = match execution_mode_str.as_str() {
        "sync" => ExecutionMode::Sync,
        _ => ExecutionMode::Async,
    };
    let parameters_schema_json: serde_json::Value = row.get("parameters_schema");
    let parameters_schema: Vec<ParameterSpec> =
        serde_json::from_value(parameters_schema_json).map_err(|e| RepositoryError::Serialization(e.to_string()))?;

    Ok(WorkflowRecord {
        id: WorkflowId(row.get("id")),
        name: row.get("name"),
        function_name: row.get("function_name"),
        path: row.get("path"),
        workflow_type,
        parameters_schema,
        schedule: row.get("schedule"),
        timeout_seconds: row.get::<i64, _>("timeout_seconds") as u64,
        execution_mode,
        endpoint_enabled: row.get("endpoint_enabled"),
        allowed_methods: row.get("allowed_methods"),
        organization_id: row.get("organization_id"),
        time_saved: row.get("time_saved"),
        value: row.get("value"),
        api_key_hash: row.get("api_key_hash"),
        is_active: row.get("is_active"),
    })
}

#[async_trait]
impl WorkflowRepository for PostgresWorkflowRepository {
    async fn save(&self, workflow: &WorkflowRecord) -> Result<(), RepositoryError> {
        let workflow_type_str = match workflow.workflow_type {
            WorkflowType::Workflow => "workflow",
            WorkflowType::DataProvider => "data_provider",
        };
        let execution_mode_str = match workflow.execution_mode {
            ExecutionMode::Sync => "sync",
            ExecutionMode::Async => "async",
        };
        let parameters_schema_json =
            serde_json::to_value(&workflow.parameters_schema).map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO workflows (
                id, name, function_name, path, workflow_type, parameters_schema, schedule,
                timeout_seconds, execution_mode, endpoint_enabled, allowed_methods, organization_id,
                time_saved, value, api_key_hash, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                function_name = EXCLUDED.function_name,
                path = EXCLUDED.path,
                workflow_type = EXCLUDED.workflow_type,
                parameters_schema = EXCLUDED.parameters_schema,
                schedule = EXCLUDED.schedule,
                timeout_seconds = EXCLUDED.timeout_seconds,
                execution_mode = EXCLUDED.execution_mode,
                endpoint_enabled = EXCLUDED.endpoint_enabled,
                allowed_methods = EXCLUDED.allowed_methods,
                is_active = EXCLUDED.is_active
            "#,
        )
        .bind(workflow.id.0)
        .bind(&workflow.name)
        .bind(&workflow.function_name)
        .bind(&workflow.path)
        .bind(workflow_type_str)
        .bind(parameters_schema_json)
        .bind(&workflow.schedule)
        .bind(workflow.timeout_seconds as i64)
        .bind(execution_mode_str)
        .bind(workflow.endpoint_enabled)
        .bind(&workflow.allowed_methods)
        .bind(workflow.organization_id)
        .bind(workflow.time_saved)
        .bind(workflow.value)
        .bind(&workflow.api_key_hash)
        .bind(workflow.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: WorkflowId) -> Result<Option<WorkflowRecord>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM workflows WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        row.map(row_to_workflow).transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<WorkflowRecord>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM workflows WHERE name = $1 AND is_active"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        row.map(row_to_workflow).transpose()
    }

    async fn list_scheduled(&self) -> Result<Vec<WorkflowRecord>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM workflows WHERE schedule IS NOT NULL AND is_active"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.into_iter().map(row_to_workflow).collect()
    }

    async fn list_all(&self) -> Result<Vec<WorkflowRecord>, RepositoryError> {
        let rows = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM workflows ORDER BY name"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        rows.into_iter().map(row_to_workflow).collect()
    }
}
