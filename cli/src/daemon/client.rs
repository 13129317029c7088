// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! HTTP client for communicating with the daemon's execution orchestration API

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio_stream::StreamExt;
use uuid::Uuid;

/// Caller identity attached to an admission request. Mirrors
/// `core::presentation::api::CallerPayload`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CallerPayload {
    pub identity: Option<String>,
    pub org_id: Option<Uuid>,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub is_api_key: bool,
    pub api_key_id: Option<Uuid>,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
struct AdmitRequestBody {
    workflow_id: Option<Uuid>,
    workflow_name: Option<String>,
    parameters: Value,
    caller: CallerPayload,
    sync: bool,
    trigger: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSlotInfo {
    pub id: u32,
    pub state: String,
    pub current_execution_id: Option<Uuid>,
    pub pid: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    pub min_workers: u32,
    pub max_workers: u32,
    pub worker_memory_threshold_mb: u64,
}

#[derive(Debug, Clone)]
pub struct DaemonClient {
    client: Client,
    base_url: String,
}

impl DaemonClient {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let client = Client::builder().build().context("Failed to create HTTP client")?;

        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}:{}", host, port)
        } else {
            format!("http://{}:{}", host, port)
        };

        Ok(Self { client, base_url })
    }

    /// `POST /executions`. Returns the new execution id.
    pub async fn trigger(
        &self,
        workflow_id: Option<Uuid>,
        workflow_name: Option<String>,
        parameters: Value,
        caller: CallerPayload,
        sync: bool,
    ) -> Result<Uuid> {
        let body = AdmitRequestBody { workflow_id, workflow_name, parameters, caller, sync, trigger: "cli" };

        let response = self
            .client
            .post(format!("{}/executions", self.base_url))
            .json(&body)
            .send()
            .await
            .context("Failed to trigger workflow")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to trigger workflow: {}", error_text);
        }

        #[derive(Deserialize)]
        struct TriggerResponse {
            execution_id: Uuid,
        }

        let parsed: TriggerResponse = response.json().await.context("Failed to parse trigger response")?;
        Ok(parsed.execution_id)
    }

    /// `GET /executions/{id}`.
    pub async fn get_execution(&self, execution_id: Uuid) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}/executions/{}", self.base_url, execution_id))
            .send()
            .await
            .context("Failed to get execution")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to get execution: {}", error_text);
        }

        response.json().await.context("Failed to parse execution response")
    }

    /// `GET /executions/{id}/logs?since_sequence=N`.
    pub async fn get_logs(&self, execution_id: Uuid, since_sequence: i64) -> Result<Vec<Value>> {
        let response = self
            .client
            .get(format!("{}/executions/{}/logs", self.base_url, execution_id))
            .query(&[("since_sequence", since_sequence)])
            .send()
            .await
            .context("Failed to get logs")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to get logs: {}", error_text);
        }

        response.json().await.context("Failed to parse logs response")
    }

    /// `SUBSCRIBE /executions/{id}/updates` over Server-Sent Events.
    pub async fn watch(&self, execution_id: Uuid) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/executions/{}/updates", self.base_url, execution_id))
            .send()
            .await
            .context("Failed to connect to update stream")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to stream updates: {}", error_text);
        }

        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Failed to read update stream chunk")?;
            let text = String::from_utf8_lossy(&chunk);

            for line in text.lines() {
                if let Some(payload) = line.strip_prefix("data: ") {
                    if let Ok(event) = serde_json::from_str::<Value>(payload) {
                        print_update(&event);
                    }
                }
            }
        }

        Ok(())
    }

    /// `POST /executions/{id}/cancel`.
    pub async fn cancel(&self, execution_id: Uuid) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/executions/{}/cancel", self.base_url, execution_id))
            .send()
            .await
            .context("Failed to cancel execution")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to cancel execution: {}", error_text);
        }

        #[derive(Deserialize)]
        struct CancelResponse {
            status: String,
        }

        let parsed: CancelResponse = response.json().await.context("Failed to parse cancel response")?;
        Ok(parsed.status)
    }

    /// `GET /executions/{id}/sync_result?deadline_seconds=N`. Blocks for up
    /// to `deadline_seconds` plus a small client-side margin.
    pub async fn sync_result(&self, execution_id: Uuid, deadline_seconds: u64) -> Result<Option<Value>> {
        let response = self
            .client
            .get(format!("{}/executions/{}/sync_result", self.base_url, execution_id))
            .query(&[("deadline_seconds", deadline_seconds)])
            .timeout(Duration::from_secs(deadline_seconds + 10))
            .send()
            .await
            .context("Failed to fetch sync result")?;

        if response.status() == reqwest::StatusCode::REQUEST_TIMEOUT {
            return Ok(None);
        }

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to fetch sync result: {}", error_text);
        }

        Ok(Some(response.json().await.context("Failed to parse sync result")?))
    }

    /// `GET /queue/depth`.
    pub async fn queue_depth(&self) -> Result<u64> {
        let response =
            self.client.get(format!("{}/queue/depth", self.base_url)).send().await.context("Failed to get queue depth")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to get queue depth: {}", error_text);
        }

        #[derive(Deserialize)]
        struct DepthResponse {
            depth: u64,
        }

        Ok(response.json::<DepthResponse>().await.context("Failed to parse queue depth")?.depth)
    }

    /// `GET /queue/{id}/position`.
    pub async fn queue_position(&self, execution_id: Uuid) -> Result<Option<u64>> {
        let response = self
            .client
            .get(format!("{}/queue/{}/position", self.base_url, execution_id))
            .send()
            .await
            .context("Failed to get queue position")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to get queue position: {}", error_text);
        }

        #[derive(Deserialize)]
        struct PositionResponse {
            position: Option<u64>,
        }

        Ok(response.json::<PositionResponse>().await.context("Failed to parse queue position")?.position)
    }

    /// `GET /admin/workers`.
    pub async fn list_workers(&self) -> Result<Vec<WorkerSlotInfo>> {
        let response =
            self.client.get(format!("{}/admin/workers", self.base_url)).send().await.context("Failed to list workers")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to list workers: {}", error_text);
        }

        response.json().await.context("Failed to parse workers response")
    }

    /// `POST /admin/workers/{id}/recycle`.
    pub async fn recycle_worker(&self, id: u32) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/admin/workers/{}/recycle", self.base_url, id))
            .send()
            .await
            .context("Failed to recycle worker")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to recycle worker: {}", error_text);
        }

        Ok(())
    }

    /// `GET /admin/worker-pool-config`.
    pub async fn get_pool_config(&self) -> Result<PoolConfig> {
        let response = self
            .client
            .get(format!("{}/admin/worker-pool-config", self.base_url))
            .send()
            .await
            .context("Failed to get worker pool config")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to get worker pool config: {}", error_text);
        }

        response.json().await.context("Failed to parse worker pool config")
    }

    /// `PUT /admin/worker-pool-config`.
    pub async fn set_pool_config(&self, config: PoolConfig) -> Result<PoolConfig> {
        let response = self
            .client
            .put(format!("{}/admin/worker-pool-config", self.base_url))
            .json(&config)
            .send()
            .await
            .context("Failed to set worker pool config")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to set worker pool config: {}", error_text);
        }

        response.json().await.context("Failed to parse worker pool config")
    }
}

fn print_update(event: &Value) {
    use colored::Colorize;

    let status = event["status"].as_str().unwrap_or("unknown");
    let timestamp = event["updated_at"].as_str().unwrap_or("");

    match status {
        "completed" => {
            println!("{} {}", format!("[{}]", timestamp).dimmed(), "completed".green().bold());
        }
        "failed" => {
            println!(
                "{} {} {}",
                format!("[{}]", timestamp).dimmed(),
                "failed".red().bold(),
                event["error"].as_str().unwrap_or("")
            );
        }
        "cancelled" => {
            println!("{} {}", format!("[{}]", timestamp).dimmed(), "cancelled".yellow().bold());
        }
        other => {
            println!("{} {}", format!("[{}]", timestamp).dimmed(), other.cyan());
        }
    }
}
