// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::execution::{Execution, ExecutionId, ExecutionStatus, TriggerSource};
use crate::domain::repository::{ExecutionRepository, RepositoryError};
use crate::domain::workflow::WorkflowId;

pub struct PostgresExecutionRepository {
    pool: PgPool,
}

impl PostgresExecutionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn trigger_str(trigger: TriggerSource) -> &'static str {
    match trigger {
        TriggerSource::User => "user",
        TriggerSource::ApiKey => "api_key",
        TriggerSource::Schedule => "schedule",
        TriggerSource::Webhook => "webhook",
        TriggerSource::AgentTool => "agent_tool",
        TriggerSource::CliSession => "cli_session",
        TriggerSource::InlineScript => "inline_script",
    }
}

fn parse_trigger(s: &str) -> TriggerSource {
    match s {
        "api_key" => TriggerSource::ApiKey,
        "schedule" => TriggerSource::Schedule,
        "webhook" => TriggerSource::Webhook,
        "agent_tool" => TriggerSource::AgentTool,
        "cli_session" => TriggerSource::CliSession,
        "inline_script" => TriggerSource::InlineScript,
        _ => TriggerSource::User,
    }
}

fn row_to_execution(row: sqlx::postgres::PgRow) -> Result<Execution, RepositoryError> {
    let status_str: String = row.get("status");
    let status = ExecutionStatus::parse(&status_str)
        .ok_or_else(|| RepositoryError::Serialization(format!("unknown execution status '{status_str}'")))?;
    let trigger_str: String = row.get("trigger");

    Ok(Execution {
        id: ExecutionId(row.get("id")),
        workflow_id: WorkflowId(row.get("workflow_id")),
        workflow_name: row.get("workflow_name"),
        organization_id: row.get("organization_id"),
        status,
        parameters: row.get("parameters"),
        result: row.get("result"),
        error: row.get("error"),
        error_type: row.get("error_type"),
        duration_ms: row.get("duration_ms"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        executed_by: row.get("executed_by"),
        time_saved: row.get("time_saved"),
        value: row.get("value"),
        api_key_id: row.get("api_key_id"),
        session_id: row.get("session_id"),
        form_id: row.get("form_id"),
        event_delivery_id: row.get("event_delivery_id"),
        trigger: parse_trigger(&trigger_str),
    })
}

const SELECT_COLUMNS: &str = "id, workflow_id, workflow_name, organization_id, status, parameters, result, \
     error, error_type, duration_ms, started_at, completed_at, executed_by, time_saved, value, \
     api_key_id, session_id, form_id, event_delivery_id, trigger";

#[async_trait]
impl ExecutionRepository for PostgresExecutionRepository {
    async fn save(&self, execution: &Execution) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO executions (
                id, workflow_id, workflow_name, organization_id, status, parameters, result,
                error, error_type, duration_ms, started_at, completed_at, executed_by, time_saved,
                value, api_key_id, session_id, form_id, event_delivery_id, trigger
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                result = EXCLUDED.result,
                error = EXCLUDED.error,
                error_type = EXCLUDED.error_type,
                duration_ms = EXCLUDED.duration_ms,
                completed_at = EXCLUDED.completed_at,
                organization_id = EXCLUDED.organization_id
            WHERE executions.status NOT IN ('success', 'failed', 'timeout', 'stuck', 'completed_with_errors', 'cancelled')
            "#,
        )
        .bind(execution.id.0)
        .bind(execution.workflow_id.0)
        .bind(&execution.workflow_name)
        .bind(execution.organization_id)
        .bind(execution.status.as_str())
        .bind(&execution.parameters)
        .bind(&execution.result)
        .bind(&execution.error)
        .bind(&execution.error_type)
        .bind(execution.duration_ms)
        .bind(execution.started_at)
        .bind(execution.completed_at)
        .bind(&execution.executed_by)
        .bind(execution.time_saved)
        .bind(execution.value)
        .bind(execution.api_key_id)
        .bind(execution.session_id)
        .bind(execution.form_id)
        .bind(execution.event_delivery_id)
        .bind(trigger_str(execution.trigger))
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: ExecutionId) -> Result<Option<Execution>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM executions WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.map(row_to_execution).transpose()
    }

    async fn find_by_workflow(&self, workflow_id: WorkflowId, limit: usize) -> Result<Vec<Execution>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM executions WHERE workflow_id = $1 ORDER BY started_at DESC LIMIT $2"
        ))
        .bind(workflow_id.0)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.into_iter().map(row_to_execution).collect()
    }

    async fn find_stuck_candidates(&self, older_than_seconds: i64) -> Result<Vec<Execution>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM executions \
             WHERE status IN ('running', 'cancelling') \
             AND started_at < now() - make_interval(secs => $1::double precision)"
        ))
        .bind(older_than_seconds as f64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.into_iter().map(row_to_execution).collect()
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<Execution>, RepositoryError> {
        let rows = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM executions ORDER BY started_at DESC LIMIT $1"))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.into_iter().map(row_to_execution).collect()
    }
}
