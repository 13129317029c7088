// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! OS-process Worker Runtime (C5/C6) — `spec.md` §9 REDESIGN FLAG, strategy
//! (a): each worker is a `bifrost-worker` subprocess communicating over
//! stdin/stdout with newline-delimited JSON, in place of the teacher's
//! Docker-container runtime. Termination is SIGTERM, a grace period, then
//! SIGKILL, mirroring the Worker Pool Manager's recycle sequence.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::dispatch::DispatchMessage;
use crate::domain::worker_pool::{WorkerId, WorkerRuntime, WorkerRuntimeError, WorkerSlot, WorkerState};

const TERMINATE_GRACE: Duration = Duration::from_secs(10);

pub struct ProcessWorkerRuntime {
    worker_binary: String,
    extra_args: Vec<String>,
    children: RwLock<HashMap<WorkerId, Child>>,
}

impl ProcessWorkerRuntime {
    pub fn new(worker_binary: impl Into<String>, extra_args: Vec<String>) -> Self {
        Self {
            worker_binary: worker_binary.into(),
            extra_args,
            children: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl WorkerRuntime for ProcessWorkerRuntime {
    async fn spawn(&self, id: WorkerId) -> Result<WorkerSlot, WorkerRuntimeError> {
        let child = Command::new(&self.worker_binary)
            .args(&self.extra_args)
            .arg("--worker-id")
            .arg(id.0.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| WorkerRuntimeError::SpawnFailed(e.to_string()))?;

        let pid = child.id();
        self.children.write().await.insert(id, child);
        info!(worker_id = %id, pid, "spawned worker process");

        Ok(WorkerSlot {
            id,
            state: WorkerState::Starting,
            current_execution_id: None,
            pid,
        })
    }

    async fn dispatch(&self, id: WorkerId, message: &DispatchMessage) -> Result<(), WorkerRuntimeError> {
        let mut line = serde_json::to_vec(message)
            .map_err(|e| WorkerRuntimeError::DeliveryFailed(id, e.to_string()))?;
        line.push(b'\n');

        let mut children = self.children.write().await;
        let child = children.get_mut(&id).ok_or_else(|| WorkerRuntimeError::DeliveryFailed(id, "worker not spawned".to_string()))?;
        let stdin = child
            .stdin
            .as_mut()
            .ok_or_else(|| WorkerRuntimeError::DeliveryFailed(id, "worker stdin closed".to_string()))?;
        stdin
            .write_all(&line)
            .await
            .map_err(|e| WorkerRuntimeError::DeliveryFailed(id, e.to_string()))
    }

    async fn terminate(&self, id: WorkerId) -> Result<(), WorkerRuntimeError> {
        let mut children = self.children.write().await;
        let Some(mut child) = children.remove(&id) else {
            return Ok(());
        };
        drop(children);

        if let Some(pid) = child.id() {
            send_sigterm(pid);
        }

        match tokio::time::timeout(TERMINATE_GRACE, child.wait()).await {
            Ok(Ok(status)) => {
                info!(worker_id = %id, ?status, "worker exited after sigterm");
                Ok(())
            }
            Ok(Err(e)) => Err(WorkerRuntimeError::TerminateFailed(id, e.to_string())),
            Err(_) => {
                warn!(worker_id = %id, "worker did not exit within grace period, sending sigkill");
                child
                    .kill()
                    .await
                    .map_err(|e| WorkerRuntimeError::TerminateFailed(id, e.to_string()))
            }
        }
    }
}

#[cfg(unix)]
fn send_sigterm(pid: u32) {
    unsafe {
        libc::kill(pid as libc::pid_t, libc::SIGTERM);
    }
}

#[cfg(not(unix))]
fn send_sigterm(_pid: u32) {}
