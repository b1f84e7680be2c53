// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Process registry interfaces and implementations.
//!
//! The registry is a keyed store of process descriptors plus the job records
//! that tie a caller-visible job identifier to its execution handle.

pub mod memory;
pub mod sqlite;

pub use self::memory::MemoryRegistry;
pub use self::sqlite::SqliteRegistry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::execution::{ExecutionHandle, ExecutionState};
use crate::process::ProcessDescriptor;

/// Errors from registry operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// A process with the same identifier is already registered.
    #[error("Process already exists: {0}")]
    ProcessAlreadyExists(String),

    /// Process was not found.
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    /// Job was not found for the process.
    #[error("Job '{job_id}' not found for process '{process_id}'")]
    JobNotFound {
        /// Process identifier.
        process_id: String,
        /// Job identifier.
        job_id: String,
    },

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored value could not be decoded.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Job record: one execution of a registered process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Caller-visible job identifier (the execution identifier).
    pub job_id: String,
    /// Process the job runs.
    pub process_id: String,
    /// Last observed state.
    pub status: ExecutionState,
    /// Backend handle of the execution.
    pub handle: ExecutionHandle,
    /// When the job was submitted.
    pub created_at: DateTime<Utc>,
    /// When the status was last written.
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Create an `accepted` job record for a fresh handle.
    pub fn accepted(handle: ExecutionHandle) -> Self {
        let now = Utc::now();
        Self {
            job_id: handle.execution_id.clone(),
            process_id: handle.process_id.clone(),
            status: ExecutionState::Accepted,
            created_at: handle.created_at,
            updated_at: now,
            handle,
        }
    }
}

/// Keyed store of process descriptors and their jobs.
#[async_trait]
pub trait ProcessRegistry: Send + Sync {
    /// Register a process. Fails if the identifier is taken.
    async fn deploy_process(&self, process: &ProcessDescriptor) -> Result<()>;

    /// All registered processes in registration order.
    async fn list_processes(&self) -> Result<Vec<ProcessDescriptor>>;

    /// Fetch a process by identifier.
    async fn get_process(&self, process_id: &str) -> Result<Option<ProcessDescriptor>>;

    /// Remove a process, returning the removed descriptor.
    async fn undeploy_process(&self, process_id: &str) -> Result<ProcessDescriptor>;

    /// Store a new job record.
    async fn insert_job(&self, job: &JobRecord) -> Result<()>;

    /// Fetch a job of a process.
    async fn get_job(&self, process_id: &str, job_id: &str) -> Result<Option<JobRecord>>;

    /// Jobs of a process, oldest first.
    async fn list_jobs(&self, process_id: &str) -> Result<Vec<JobRecord>>;

    /// Record the last observed state of a job.
    async fn update_job_status(
        &self,
        process_id: &str,
        job_id: &str,
        status: ExecutionState,
    ) -> Result<()>;
}
