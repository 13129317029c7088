// Copyright (c) 2026 Bifrost Orchestrator Contributors
// SPDX-License-Identifier: AGPL-3.0

//! # Presentation Layer
//!
//! HTTP surface (Axum) that translates external requests into application
//! service calls. **No business logic lives here** — all real work is
//! delegated to application services in `crate::application`.
//!
//! `spec.md` §6 lists these as the surfaces the core exposes, callable from
//! an HTTP/WS layer that is itself out of scope; [`api`] is that layer's
//! concrete implementation in `bifrostd`.

pub mod api;
