// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! ADES Environment - Kubernetes Execution Backend
//!
//! Runs registered CWL processes as batch jobs on a Kubernetes cluster and
//! maps the job status back to WPS-T execution states.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                 WpsService (ades-core)                           │
//! └──────────────────────────────────────────────────────────────────┘
//!                         │ ExecutionBackend
//!                         ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                 K8sBackend (This Crate)                          │
//! │  ┌────────────┐  ┌──────────────┐  ┌────────────┐  ┌──────────┐  │
//! │  │   Naming   │  │ Provisioning │  │  Builder   │  │Reconciler│  │
//! │  └────────────┘  └──────────────┘  └────────────┘  └──────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//!                         │ ControlPlane
//!                         ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │            Kubernetes API (namespaces, secrets, RBAC,            │
//! │            persistent volume claims, batch jobs)                 │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Per-execution objects
//!
//! | Object | Name | Notes |
//! |--------|------|-------|
//! | Volume claim | `input-data-{id}` | ReadWriteOnce + ReadOnlyMany, mounted read-only |
//! | Volume claim | `tmpout-{id}` | ReadWriteMany |
//! | Volume claim | `output-data-{id}` | ReadWriteMany, holds results |
//! | Job | `job-{id}` | CWL runner, restart `Never`, no retries |
//!
//! # Shared objects
//!
//! Created once by [`provisioning::Provisioner`]: the working namespace, the
//! `pod-manager-role` and `log-reader-role` roles bound to the service
//! account, and the `aws-creds` secret when object-store credentials are set.
//!
//! # Configuration
//!
//! See [`config::Config::from_env`].

pub mod backend;
pub mod builder;
pub mod config;
pub mod control_plane;
pub mod naming;
pub mod provisioning;
pub mod reconciler;
pub mod resources;

pub use backend::K8sBackend;
pub use config::Config;
pub use control_plane::{ControlPlane, ControlPlaneError, KubeClient, MockControlPlane};
pub use provisioning::{ObjectStoreCredentials, Provisioner};
