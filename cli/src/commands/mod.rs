// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Bifrost CLI

pub mod admin;
pub mod config;
pub mod daemon;
pub mod queue;
pub mod update;
pub mod workflow;

pub use self::admin::AdminCommand;
pub use self::config::ConfigCommand;
pub use self::daemon::DaemonCommand;
pub use self::queue::QueueCommand;
pub use self::update::UpdateCommand;
pub use self::workflow::WorkflowCommand;
