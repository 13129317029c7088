// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Scheduler (C9) domain types. A workflow's `schedule` field (cron
//! expression) is parsed by the `cron` crate; this module tracks per-workflow
//! fire state and the supplemented sub-5-minute interval guard grounded in
//! `original_source/api/src/jobs/schedulers/cron_scheduler.py`.

use chrono::{DateTime, Utc};

use crate::domain::workflow::WorkflowId;

/// Cron intervals shorter than this are allowed but generate a structured
/// warning at registration/tick time, matching the Python scheduler's guard.
pub const MIN_RECOMMENDED_INTERVAL_SECONDS: i64 = 300;

#[derive(Debug, Clone, Copy)]
pub struct CronState {
    pub workflow_id: WorkflowId,
    pub last_fired_at: Option<DateTime<Utc>>,
    pub next_due_at: Option<DateTime<Utc>>,
}

impl CronState {
    pub fn new(workflow_id: WorkflowId) -> Self {
        Self {
            workflow_id,
            last_fired_at: None,
            next_due_at: None,
        }
    }

    /// Whether this workflow is due to fire at `now`, given `next_due_at`
    /// computed from its cron expression.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.next_due_at {
            Some(due) => now >= due,
            None => false,
        }
    }

    pub fn fired(&mut self, now: DateTime<Utc>, next_due_at: DateTime<Utc>) {
        self.last_fired_at = Some(now);
        self.next_due_at = Some(next_due_at);
    }
}

/// `true` when consecutive scheduled firings imply an interval under the
/// recommended minimum. Pure check over two computed fire times so it can be
/// unit tested without parsing a real cron expression.
pub fn is_interval_too_short(first_due: DateTime<Utc>, second_due: DateTime<Utc>) -> bool {
    (second_due - first_due).num_seconds() < MIN_RECOMMENDED_INTERVAL_SECONDS
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn not_due_without_next_due_at() {
        let state = CronState::new(WorkflowId::new());
        assert!(!state.is_due(Utc::now()));
    }

    #[test]
    fn due_once_now_passes_next_due_at() {
        let mut state = CronState::new(WorkflowId::new());
        let due = Utc::now() - Duration::seconds(1);
        state.next_due_at = Some(due);
        assert!(state.is_due(Utc::now()));
    }

    #[test]
    fn flags_sub_five_minute_interval() {
        let first = Utc::now();
        let second = first + Duration::seconds(60);
        assert!(is_interval_too_short(first, second));
        let third = first + Duration::seconds(600);
        assert!(!is_interval_too_short(first, third));
    }
}
