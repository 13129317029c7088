// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod admission;
pub mod authorization;
pub mod errors;
pub mod log_fanout;
pub mod pool_manager;
pub mod scheduler;
pub mod stuck_monitor;
pub mod webhook_dispatcher;
pub mod worker_runtime;

pub use admission::{AdmissionGate, AdmissionRequest, StandardAdmissionGate, WorkflowRef};
pub use errors::OrchestrationError;
