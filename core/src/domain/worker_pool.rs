// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Worker Pool Manager (C5) domain types: worker lifecycle state, the pool's
//! sizing policy, and the `WorkerRuntime` transport trait.
//!
//! `WorkerRuntime` plays the role the teacher's
//! `infrastructure::runtime::DockerRuntime` plays for its `AgentRuntime`
//! trait, but is implemented against OS processes
//! (`infrastructure::process_runtime::ProcessWorkerRuntime`) rather than
//! Docker containers (`spec.md` §9 REDESIGN FLAG, strategy (a)).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::dispatch::DispatchMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub u32);

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Lifecycle state of a single worker slot (`spec.md` §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Idle,
    Busy,
    Starting,
    Draining,
    Dead,
}

/// Pool sizing policy: `min_workers <= max_workers`, scale-up gated by
/// available system memory (`infrastructure::memory_monitor`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoolPolicy {
    pub min_workers: u32,
    pub max_workers: u32,
    pub worker_memory_threshold_mb: u64,
}

impl Default for PoolPolicy {
    fn default() -> Self {
        Self {
            min_workers: 2,
            max_workers: 10,
            worker_memory_threshold_mb: 300,
        }
    }
}

#[derive(Debug, Error)]
pub enum PoolPolicyError {
    #[error("min_workers ({0}) must be at least 1")]
    MinWorkersTooLow(u32),
    #[error("min_workers ({min}) must not exceed max_workers ({max})")]
    MinExceedsMax { min: u32, max: u32 },
}

impl PoolPolicy {
    pub fn validated(
        min_workers: u32,
        max_workers: u32,
        worker_memory_threshold_mb: u64,
    ) -> Result<Self, PoolPolicyError> {
        if min_workers < 1 {
            return Err(PoolPolicyError::MinWorkersTooLow(min_workers));
        }
        if min_workers > max_workers {
            return Err(PoolPolicyError::MinExceedsMax {
                min: min_workers,
                max: max_workers,
            });
        }
        Ok(Self {
            min_workers,
            max_workers,
            worker_memory_threshold_mb,
        })
    }

    /// Whether the pool may spawn another worker given `current_count` and
    /// `available_memory_mb` as read from `/proc/meminfo`.
    pub fn can_scale_up(&self, current_count: u32, available_memory_mb: u64) -> bool {
        current_count < self.max_workers && available_memory_mb >= self.worker_memory_threshold_mb
    }

    pub fn should_scale_down(&self, current_count: u32, idle_count: u32) -> bool {
        current_count > self.min_workers && idle_count > 0
    }
}

/// A worker slot as tracked by the pool manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSlot {
    pub id: WorkerId,
    pub state: WorkerState,
    pub current_execution_id: Option<crate::domain::execution::ExecutionId>,
    pub pid: Option<u32>,
}

impl WorkerSlot {
    pub fn starting(id: WorkerId) -> Self {
        Self {
            id,
            state: WorkerState::Starting,
            current_execution_id: None,
            pid: None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, WorkerState::Idle)
    }
}

#[derive(Debug, Error)]
pub enum WorkerRuntimeError {
    #[error("failed to spawn worker process: {0}")]
    SpawnFailed(String),
    #[error("worker {0} did not respond before the deadline")]
    Unresponsive(WorkerId),
    #[error("failed to deliver dispatch to worker {0}: {1}")]
    DeliveryFailed(WorkerId, String),
    #[error("failed to terminate worker {0}: {1}")]
    TerminateFailed(WorkerId, String),
}

/// Transport abstraction for handing work to a worker and reclaiming it.
/// Implemented by `infrastructure::process_runtime::ProcessWorkerRuntime`
/// over `tokio::process::Command` + stdio framing.
#[async_trait]
pub trait WorkerRuntime: Send + Sync {
    async fn spawn(&self, id: WorkerId) -> Result<WorkerSlot, WorkerRuntimeError>;
    async fn dispatch(&self, id: WorkerId, message: &DispatchMessage) -> Result<(), WorkerRuntimeError>;
    async fn terminate(&self, id: WorkerId) -> Result<(), WorkerRuntimeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_spec_defaults() {
        let policy = PoolPolicy::default();
        assert_eq!(policy.min_workers, 2);
        assert_eq!(policy.worker_memory_threshold_mb, 300);
    }

    #[test]
    fn rejects_min_above_max() {
        let err = PoolPolicy::validated(5, 3, 300).unwrap_err();
        assert!(matches!(err, PoolPolicyError::MinExceedsMax { .. }));
    }

    #[test]
    fn scale_up_blocked_by_low_memory() {
        let policy = PoolPolicy::default();
        assert!(!policy.can_scale_up(2, 100));
        assert!(policy.can_scale_up(2, 500));
    }

    #[test]
    fn scale_down_respects_minimum() {
        let policy = PoolPolicy::default();
        assert!(!policy.should_scale_down(2, 1));
        assert!(policy.should_scale_down(3, 1));
    }
}
