// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Worker pool configuration and webhook secrets (supplemented feature,
//! grounded in `original_source/api/src/services/worker_pool_config_service.py`).
//! A single-row table holds the live `PoolPolicy`; webhook secrets are
//! keyed by source id.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::repository::{RepositoryError, SystemConfigRepository};
use crate::domain::worker_pool::PoolPolicy;

pub struct PostgresSystemConfigRepository {
    pool: PgPool,
}

impl PostgresSystemConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SystemConfigRepository for PostgresSystemConfigRepository {
    async fn get_worker_pool_config(&self) -> Result<Option<PoolPolicy>, RepositoryError> {
        let row = sqlx::query(
            "SELECT min_workers, max_workers, worker_memory_threshold_mb FROM worker_pool_config WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(row.map(|row| PoolPolicy {
            min_workers: row.get::<i32, _>("min_workers") as u32,
            max_workers: row.get::<i32, _>("max_workers") as u32,
            worker_memory_threshold_mb: row.get::<i64, _>("worker_memory_threshold_mb") as u64,
        }))
    }

    async fn save_worker_pool_config(&self, policy: &PoolPolicy) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO worker_pool_config (id, min_workers, max_workers, worker_memory_threshold_mb)
            VALUES (1, $1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                min_workers = EXCLUDED.min_workers,
                max_workers = EXCLUDED.max_workers,
                worker_memory_threshold_mb = EXCLUDED.worker_memory_threshold_mb
            "#,
        )
        .bind(policy.min_workers as i32)
        .bind(policy.max_workers as i32)
        .bind(policy.worker_memory_threshold_mb as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(())
    }

    async fn get_webhook_secret(&self, source_id: &str) -> Result<Option<String>, RepositoryError> {
        let row = sqlx::query("SELECT secret FROM webhook_secrets WHERE source_id = $1")
            .bind(source_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(row.map(|row| row.get("secret")))
    }
}
