// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! ADES Core - backend-agnostic process execution model
//!
//! This crate holds everything of the Application Deployment and Execution
//! Service that does not depend on where executions run:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                  REST / WPS-T front end                        │
//! └───────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     WpsService (this crate)                    │
//! │   deploy / undeploy / execute / status / dismiss / results     │
//! └───────────────────────────────────────────────────────────────┘
//!              │                                   │
//!              ▼                                   ▼
//! ┌───────────────────────────┐     ┌───────────────────────────────┐
//! │     ProcessRegistry       │     │       ExecutionBackend        │
//! │  (memory, SQLite)         │     │  (ades-environment: k8s)      │
//! └───────────────────────────┘     └───────────────────────────────┘
//! ```
//!
//! # Job Status State Machine
//!
//! ```text
//!   accepted ──► running ──► successful
//!      │            │    └─► failed
//!      └────────────┴──────► dismissed
//! ```
//!
//! `accepted` is initial; `successful`, `failed` and `dismissed` are terminal.
//! Transitions other than `dismissed` are observed from the backend, never
//! driven by this crate.
//!
//! # Modules
//!
//! - [`process`]: Process descriptors and job-control options
//! - [`execution`]: Execution requests, handles, states and results
//! - [`backend`]: The [`ExecutionBackend`](backend::ExecutionBackend) trait and a mock
//! - [`registry`]: The [`ProcessRegistry`](registry::ProcessRegistry) trait and stores
//! - [`service`]: The WPS-T facade

#![deny(missing_docs)]

/// Process descriptors.
pub mod process;

/// Execution requests, handles and states.
pub mod execution;

/// Execution backends.
pub mod backend;

/// Process registry and job records.
pub mod registry;

/// WPS-T service facade.
pub mod service;

pub use backend::{BackendError, ExecutionBackend};
pub use execution::{
    ExecutionHandle, ExecutionInputs, ExecutionMode, ExecutionRequest, ExecutionResults,
    ExecutionState, InputValue, ResultLink,
};
pub use process::{JobControlOption, ProcessDescriptor, TransmissionMode};
pub use registry::{JobRecord, ProcessRegistry, RegistryError};
pub use service::{JobInfo, ServiceError, WpsService};
