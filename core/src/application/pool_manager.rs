// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Worker Pool Manager (C5) — `spec.md` §4.5.
//!
//! Owns the set of worker slots, autoscales between `min_workers` and
//! `max_workers`, gates scale-up on memory availability, and drives the
//! SIGTERM → grace → SIGKILL recycle sequence through `WorkerRuntime`.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::application::errors::OrchestrationError;
use crate::domain::repository::SystemConfigRepository;
use crate::domain::worker_pool::{PoolPolicy, WorkerId, WorkerRuntime, WorkerSlot, WorkerState};

/// Reads `MemAvailable` from `/proc/meminfo`; `infrastructure::memory_monitor`
/// supplies the real implementation, a constant-return stub backs tests.
#[async_trait::async_trait]
pub trait MemoryMonitor: Send + Sync {
    async fn available_mb(&self) -> Option<u64>;
}

pub struct WorkerPoolManager {
    runtime: Arc<dyn WorkerRuntime>,
    memory_monitor: Arc<dyn MemoryMonitor>,
    config_repository: Arc<dyn SystemConfigRepository>,
    policy: RwLock<PoolPolicy>,
    slots: RwLock<Vec<WorkerSlot>>,
    next_id: RwLock<u32>,
}

impl WorkerPoolManager {
    pub fn new(
        runtime: Arc<dyn WorkerRuntime>,
        memory_monitor: Arc<dyn MemoryMonitor>,
        config_repository: Arc<dyn SystemConfigRepository>,
        default_policy: PoolPolicy,
    ) -> Self {
        Self {
            runtime,
            memory_monitor,
            config_repository,
            policy: RwLock::new(default_policy),
            slots: RwLock::new(Vec::new()),
            next_id: RwLock::new(0),
        }
    }

    /// Loads persisted `min_workers`/`max_workers` (supplemented feature),
    /// falling back to the env/CLI default passed to `new` if unset.
    pub async fn load_persisted_policy(&self) -> Result<(), OrchestrationError> {
        if let Some(persisted) = self.config_repository.get_worker_pool_config().await? {
            *self.policy.write() = persisted;
        }
        Ok(())
    }

    pub fn policy(&self) -> PoolPolicy {
        *self.policy.read()
    }

    pub async fn set_policy(&self, policy: PoolPolicy) -> Result<(), OrchestrationError> {
        self.config_repository.save_worker_pool_config(&policy).await?;
        *self.policy.write() = policy;
        Ok(())
    }

    pub fn slots(&self) -> Vec<WorkerSlot> {
        self.slots.read().clone()
    }

    fn allocate_id(&self) -> WorkerId {
        let mut next = self.next_id.write();
        let id = WorkerId(*next);
        *next += 1;
        id
    }

    async fn spawn_one(&self) -> Result<(), OrchestrationError> {
        let id = self.allocate_id();
        let slot = self
            .runtime
            .spawn(id)
            .await
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
        self.slots.write().push(slot);
        info!(worker_id = %id, "spawned worker");
        Ok(())
    }

    /// Ensures at least `min_workers` slots exist. Call once at daemon
    /// startup, after `load_persisted_policy`.
    pub async fn ensure_minimum(&self) -> Result<(), OrchestrationError> {
        let min_workers = self.policy().min_workers;
        while self.slots.read().len() < min_workers as usize {
            self.spawn_one().await?;
        }
        Ok(())
    }

    /// One autoscale tick: scale up if all non-dead workers are busy and
    /// the queue has depth, gated on memory availability.
    pub async fn maybe_scale_up(&self, queue_depth: u64) -> Result<(), OrchestrationError> {
        let policy = self.policy();
        let (current_count, all_busy) = {
            let slots = self.slots.read();
            let live: Vec<&WorkerSlot> = slots.iter().filter(|s| s.state != WorkerState::Dead).collect();
            let busy = !live.is_empty() && live.iter().all(|s| s.state == WorkerState::Busy);
            (live.len() as u32, busy)
        };

        if !(all_busy && queue_depth >= 1) {
            return Ok(());
        }

        let available_mb = self.memory_monitor.available_mb().await.unwrap_or(u64::MAX);
        if !policy.can_scale_up(current_count, available_mb) {
            warn!(available_mb, threshold_mb = policy.worker_memory_threshold_mb, "scale-up denied, queue will drain via existing workers");
            return Ok(());
        }
        self.spawn_one().await
    }

    /// Recycles a worker: SIGTERM → grace period → SIGKILL, handled inside
    /// `WorkerRuntime::terminate`; any execution that was BUSY on this
    /// worker is left for C11 to transition.
    pub async fn recycle(&self, id: WorkerId) -> Result<(), OrchestrationError> {
        self.runtime
            .terminate(id)
            .await
            .map_err(|e| OrchestrationError::TransientInfrastructure(e.to_string()))?;
        let mut slots = self.slots.write();
        if let Some(slot) = slots.iter_mut().find(|s| s.id == id) {
            slot.state = WorkerState::Dead;
            slot.current_execution_id = None;
        }
        info!(worker_id = %id, "recycled worker");
        Ok(())
    }
}
