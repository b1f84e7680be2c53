// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory registry, used for embedding and tests.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{JobRecord, ProcessRegistry, RegistryError, Result};
use crate::execution::ExecutionState;
use crate::process::ProcessDescriptor;

#[derive(Default)]
struct Inner {
    processes: Vec<ProcessDescriptor>,
    jobs: Vec<JobRecord>,
}

/// Insertion-ordered in-memory registry.
#[derive(Default)]
pub struct MemoryRegistry {
    inner: RwLock<Inner>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProcessRegistry for MemoryRegistry {
    async fn deploy_process(&self, process: &ProcessDescriptor) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.processes.iter().any(|p| p.id == process.id) {
            return Err(RegistryError::ProcessAlreadyExists(process.id.clone()));
        }
        inner.processes.push(process.clone());
        Ok(())
    }

    async fn list_processes(&self) -> Result<Vec<ProcessDescriptor>> {
        Ok(self.inner.read().await.processes.clone())
    }

    async fn get_process(&self, process_id: &str) -> Result<Option<ProcessDescriptor>> {
        let inner = self.inner.read().await;
        Ok(inner.processes.iter().find(|p| p.id == process_id).cloned())
    }

    async fn undeploy_process(&self, process_id: &str) -> Result<ProcessDescriptor> {
        let mut inner = self.inner.write().await;
        let index = inner
            .processes
            .iter()
            .position(|p| p.id == process_id)
            .ok_or_else(|| RegistryError::ProcessNotFound(process_id.to_string()))?;
        Ok(inner.processes.remove(index))
    }

    async fn insert_job(&self, job: &JobRecord) -> Result<()> {
        self.inner.write().await.jobs.push(job.clone());
        Ok(())
    }

    async fn get_job(&self, process_id: &str, job_id: &str) -> Result<Option<JobRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .jobs
            .iter()
            .find(|j| j.process_id == process_id && j.job_id == job_id)
            .cloned())
    }

    async fn list_jobs(&self, process_id: &str) -> Result<Vec<JobRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .jobs
            .iter()
            .filter(|j| j.process_id == process_id)
            .cloned()
            .collect())
    }

    async fn update_job_status(
        &self,
        process_id: &str,
        job_id: &str,
        status: ExecutionState,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .iter_mut()
            .find(|j| j.process_id == process_id && j.job_id == job_id)
            .ok_or_else(|| RegistryError::JobNotFound {
                process_id: process_id.to_string(),
                job_id: job_id.to_string(),
            })?;
        job.status = status;
        job.updated_at = Utc::now();
        Ok(())
    }
}
