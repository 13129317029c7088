// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # bifrost-orchestrator-core
//!
//! The execution orchestration core: admission, queueing, dispatch, worker
//! pooling, authorization, log/result fan-out, scheduling, webhook delivery,
//! and stuck-execution detection for the Bifrost workflow platform.
//!
//! ## Components
//!
//! | Component | Domain | Application | Infrastructure |
//! |---|---|---|---|
//! | Admission Gate | [`domain::execution`] | [`application::admission`] | — |
//! | Pending Store | [`domain::pending`] | — | [`infrastructure::redis_store`] |
//! | Queue Position Tracker | [`domain::queue`] | — | [`infrastructure::redis_queue`] |
//! | Broker Producer | [`domain::dispatch`] | [`application::admission`] | [`infrastructure::broker`] |
//! | Worker Pool Manager | [`domain::worker_pool`] | [`application::pool_manager`] | [`infrastructure::process_runtime`], [`infrastructure::memory_monitor`] |
//! | Worker Runtime | [`domain::execution`] | [`application::worker_runtime`] | [`infrastructure::module_cache`] |
//! | Authorization Resolver | [`domain::authorization`] | [`application::authorization`] | [`infrastructure::repositories::postgres_access`] |
//! | Log & Result Fan-out | [`domain::execution_log`] | [`application::log_fanout`] | [`infrastructure::redis_pubsub`] |
//! | Scheduler | [`domain::schedule`] | [`application::scheduler`] | — |
//! | Event/Webhook Dispatcher | [`domain::event`] | [`application::webhook_dispatcher`] | [`infrastructure::webhook_adapters`] |
//! | Stuck Execution Monitor | [`domain::execution`] | [`application::stuck_monitor`] | — |
//!
//! ## Layer structure
//!
//! ```text
//! presentation/   <- Axum HTTP surface (admission, polling, SSE updates, admin)
//!     v
//! application/    <- Use-cases orchestrating domain + infrastructure
//!     v
//! domain/         <- Aggregates, value objects, repository traits
//!     v
//! infrastructure/ <- Postgres repositories, Redis, AMQP broker, process runtime
//! ```

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
