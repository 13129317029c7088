// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Centralizes Redis key naming so every Redis-backed adapter agrees on the
//! same layout (`spec.md` §3's ephemeral state table). All keys are
//! namespaced under `bifrost:` to coexist with unrelated data in a shared
//! Redis instance.

use crate::domain::execution::ExecutionId;

pub fn pending_execution(id: ExecutionId) -> String {
    format!("bifrost:pending:{id}")
}

pub const QUEUE_SET: &str = "bifrost:queue";

pub fn update_channel(id: ExecutionId) -> String {
    format!("bifrost:updates:{id}")
}

pub fn result_inbox(id: ExecutionId) -> String {
    format!("bifrost:result:{id}")
}

pub fn module_cache_entry(path: &str) -> String {
    format!("bifrost:module:{path}")
}

pub fn worker_heartbeat(worker_id: u32) -> String {
    format!("bifrost:worker:{worker_id}:heartbeat")
}

pub fn worker_assignment(worker_id: u32) -> String {
    format!("bifrost:worker:{worker_id}:execution")
}

/// Reverse index: which worker currently holds `execution_id`, maintained
/// alongside `worker_assignment` so the Stuck Execution Monitor can resolve
/// a heartbeat without scanning every worker slot.
pub fn execution_worker_index(execution_id: ExecutionId) -> String {
    format!("bifrost:execution_worker:{execution_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        let id = ExecutionId::new();
        assert!(pending_execution(id).starts_with("bifrost:pending:"));
        assert!(update_channel(id).starts_with("bifrost:updates:"));
        assert!(result_inbox(id).starts_with("bifrost:result:"));
    }
}
