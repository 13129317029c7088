// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Execution Log Row and the update-channel event envelope (C8).
//!
//! Log sequence is strictly increasing per execution (invariant 4); the
//! emitter supplies the sequence number, the [`SequenceCounter`] guarantees
//! monotonicity within a single worker process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::execution::ExecutionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRow {
    pub execution_id: ExecutionId,
    pub sequence: i64,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub metadata: serde_json::Value,
}

/// Monotonic per-execution sequence generator. One instance lives for the
/// lifetime of a single worker's handling of one execution.
#[derive(Debug, Default)]
pub struct SequenceCounter(i64);

impl SequenceCounter {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn next(&mut self) -> i64 {
        self.0 += 1;
        self.0
    }
}

/// Update-channel event published on `spec.md` §4.8's per-execution pub/sub
/// channel. Wire format is byte-exact with `spec.md` §6: JSON, snake_case,
/// `type` discriminator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateEvent {
    Log {
        execution_id: ExecutionId,
        sequence: i64,
        level: LogLevel,
        message: String,
    },
    Status {
        execution_id: ExecutionId,
        status: crate::domain::execution::ExecutionStatus,
    },
    Progress {
        execution_id: ExecutionId,
        phase: String,
        fraction: Option<f64>,
    },
    QueuePosition {
        execution_id: ExecutionId,
        position: Option<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_counter_is_strictly_increasing() {
        let mut counter = SequenceCounter::new();
        let seqs: Vec<i64> = (0..5).map(|_| counter.next()).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn update_event_serializes_with_type_tag() {
        let event = UpdateEvent::QueuePosition {
            execution_id: ExecutionId::new(),
            position: Some(3),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "queue_position");
        assert_eq!(json["position"], 3);
    }
}
