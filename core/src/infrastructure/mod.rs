// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod broker;
pub mod cancellation;
pub mod db;
pub mod echo_script_runtime;
pub mod memory_monitor;
pub mod module_cache;
pub mod process_runtime;
pub mod redis_keys;
pub mod redis_pubsub;
pub mod redis_queue;
pub mod redis_store;
pub mod redis_worker_state;
pub mod repositories;
pub mod webhook_adapters;
