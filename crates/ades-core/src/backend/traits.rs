// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Execution backend trait definitions.
//!
//! Defines the abstract interface the WPS-T service uses to run processes.

use async_trait::async_trait;
use thiserror::Error;

use crate::execution::{ExecutionHandle, ExecutionRequest, ExecutionResults, ExecutionState};
use crate::process::ProcessDescriptor;

/// Errors from backend operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    /// Every generated resource name collided with an existing resource.
    #[error("Name collision: '{name}' already exists after {attempts} attempt(s)")]
    NameCollision {
        /// Last name that collided.
        name: String,
        /// Number of identifiers tried.
        attempts: u32,
    },

    /// The control plane rejected or failed a call.
    #[error("Control plane error during {operation} (execution {execution_id}): {message}")]
    ControlPlane {
        /// Operation that failed (e.g. "create_job").
        operation: String,
        /// Execution identifier, or "-" for cluster-scoped operations.
        execution_id: String,
        /// Underlying control-plane error.
        message: String,
    },

    /// The native workload status could not be mapped to an execution state.
    #[error("Unrecognized status for workload '{workload}': {detail}")]
    UnrecognizedStatus {
        /// Workload name.
        workload: String,
        /// The native status fragment that was not understood.
        detail: String,
    },

    /// Results were requested for an execution that has not succeeded.
    #[error("Results unavailable for execution {execution_id} in state {state}")]
    ResultsUnavailable {
        /// Execution identifier.
        execution_id: String,
        /// Current state.
        state: ExecutionState,
    },

    /// The backend resources of the execution no longer exist.
    #[error("Execution not found: {0}")]
    ExecutionNotFound(String),

    /// The process descriptor cannot be run by this backend.
    #[error("Invalid process '{process_id}': {reason}")]
    InvalidProcess {
        /// Process identifier.
        process_id: String,
        /// Why the process was rejected.
        reason: String,
    },

    /// The handle was produced by another backend or is malformed.
    #[error("Invalid execution handle: {0}")]
    InvalidHandle(String),

    /// Other error.
    #[error("Other: {0}")]
    Other(String),
}

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Trait for execution backends.
///
/// Backends translate process executions into backend resources and map the
/// backend's native status back into [`ExecutionState`]. They are stateless
/// with respect to execution progress: the backend itself is the source of
/// truth and every state query is recomputed from it.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Backend type identifier (e.g. "k8s", "mock").
    fn backend_type(&self) -> &'static str;

    /// Prepare the backend for a newly registered process.
    async fn deploy(&self, process: &ProcessDescriptor) -> Result<ProcessDescriptor>;

    /// Release anything the backend holds for a removed process.
    async fn undeploy(&self, process: &ProcessDescriptor) -> Result<ProcessDescriptor>;

    /// Provision resources for one execution and start it.
    async fn submit(
        &self,
        process: &ProcessDescriptor,
        request: &ExecutionRequest,
    ) -> Result<ExecutionHandle>;

    /// Cancel an execution. Best-effort: teardown may complete asynchronously.
    async fn dismiss(&self, handle: &ExecutionHandle) -> Result<ExecutionState>;

    /// Current state of an execution, recomputed from the backend.
    async fn state(&self, handle: &ExecutionHandle) -> Result<ExecutionState>;

    /// Result locations of a successful execution.
    ///
    /// Returns [`BackendError::ResultsUnavailable`] in any other state.
    async fn results(&self, handle: &ExecutionHandle) -> Result<ExecutionResults>;
}
