// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::execution::ExecutionId;
use crate::domain::execution_log::{LogLevel, LogRow};
use crate::domain::repository::{ExecutionLogRepository, RepositoryError};

pub struct PostgresExecutionLogRepository {
    pool: PgPool,
}

impl PostgresExecutionLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn level_str(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

fn parse_level(s: &str) -> LogLevel {
    match s {
        "debug" => LogLevel::Debug,
        "warn" => LogLevel::Warn,
        "error" => LogLevel::Error,
        _ => LogLevel::Info,
    }
}

fn row_to_log(row: PgRow) -> Result<LogRow, RepositoryError> {
    let level_str: String = row.get("level");
    Ok(LogRow {
        execution_id: ExecutionId(row.get("execution_id")),
        sequence: row.get("sequence"),
        timestamp: row.get("timestamp"),
        level: parse_level(&level_str),
        message: row.get("message"),
        metadata: row.get("metadata"),
    })
}

#[async_trait]
impl ExecutionLogRepository for PostgresExecutionLogRepository {
    async fn append(&self, row: &LogRow) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO execution_logs (execution_id, sequence, timestamp, level, message, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (execution_id, sequence) DO NOTHING
            "#,
        )
        .bind(row.execution_id.0)
        .bind(row.sequence)
        .bind(row.timestamp)
        .bind(level_str(row.level))
        .bind(&row.message)
        .bind(&row.metadata)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(())
    }

    async fn find_by_execution(&self, execution_id: ExecutionId) -> Result<Vec<LogRow>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT execution_id, sequence, timestamp, level, message, metadata \
             FROM execution_logs WHERE execution_id = $1 ORDER BY sequence ASC",
        )
        .bind(execution_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.into_iter().map(row_to_log).collect()
    }
}
