// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Wraps `sqlx::postgres::PgPool` in a thin `Database` newtype injected into
//! every Postgres repository implementation under `infrastructure::repositories`.

use sqlx::postgres::{PgPool, PgPoolOptions};
use anyhow::Result;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(connection_string: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }
}
