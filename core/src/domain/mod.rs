// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod authorization;
pub mod dispatch;
pub mod event;
pub mod execution;
pub mod execution_log;
pub mod pending;
pub mod queue;
pub mod repository;
pub mod schedule;
pub mod worker_pool;
pub mod workflow;
