// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! WPS-T service facade.
//!
//! [`WpsService`] is what a REST front end calls. It composes a
//! [`ProcessRegistry`] (process descriptors and job records) with an
//! [`ExecutionBackend`] (where executions actually run) and applies the
//! job-control rules of the WPS-T protocol.
//!
//! Job state is owned by the backend. The service only persists the last
//! observed state so that terminal states (including `dismissed`, which the
//! backend cannot observe once the workload is gone) are answered without a
//! backend round trip.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::backend::{BackendError, ExecutionBackend};
use crate::execution::{ExecutionRequest, ExecutionResults, ExecutionState};
use crate::process::{JobControlOption, ProcessDescriptor};
use crate::registry::{JobRecord, ProcessRegistry, RegistryError};

/// Errors returned by the service facade.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError {
    /// Process was not found.
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    /// Job was not found.
    #[error("Job '{job_id}' not found for process '{process_id}'")]
    JobNotFound {
        /// Process identifier.
        process_id: String,
        /// Job identifier.
        job_id: String,
    },

    /// The process does not advertise the requested job-control mode.
    #[error("Process '{process_id}' does not support {option}")]
    UnsupportedJobControl {
        /// Process identifier.
        process_id: String,
        /// The rejected mode.
        option: JobControlOption,
    },

    /// The job already reached a terminal state.
    #[error("Job '{job_id}' is already {state}")]
    JobAlreadyTerminal {
        /// Job identifier.
        job_id: String,
        /// Terminal state.
        state: ExecutionState,
    },

    /// Results were requested before the job succeeded.
    #[error("Results of job '{job_id}' are unavailable in state {state}")]
    ResultsUnavailable {
        /// Job identifier.
        job_id: String,
        /// Current state.
        state: ExecutionState,
    },

    /// Fetching a process description failed.
    #[error("Failed to fetch process description from {url}: {message}")]
    Fetch {
        /// Source URL.
        url: String,
        /// Failure detail.
        message: String,
    },

    /// Backend operation failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Registry operation failed.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The execution was submitted but its job record could not be stored.
    /// Dismissal is attempted; leftovers are named by `job_id`.
    #[error("Job '{job_id}' was submitted but not recorded: {source}")]
    JobNotRecorded {
        /// Execution identifier of the orphaned submission.
        job_id: String,
        /// Why the record was not stored.
        #[source]
        source: RegistryError,
    },
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Caller-visible job status document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInfo {
    /// Job identifier.
    #[serde(rename = "jobID")]
    pub job_id: String,
    /// Process identifier.
    #[serde(rename = "processID")]
    pub process_id: String,
    /// Current status.
    pub status: ExecutionState,
}

impl From<&JobRecord> for JobInfo {
    fn from(job: &JobRecord) -> Self {
        Self {
            job_id: job.job_id.clone(),
            process_id: job.process_id.clone(),
            status: job.status,
        }
    }
}

/// WPS-T operations over a registry and an execution backend.
pub struct WpsService {
    registry: Arc<dyn ProcessRegistry>,
    backend: Arc<dyn ExecutionBackend>,
    http: reqwest::Client,
}

impl WpsService {
    /// Create a service.
    pub fn new(registry: Arc<dyn ProcessRegistry>, backend: Arc<dyn ExecutionBackend>) -> Self {
        Self {
            registry,
            backend,
            http: reqwest::Client::new(),
        }
    }

    /// The backend executions run on.
    pub fn backend(&self) -> &Arc<dyn ExecutionBackend> {
        &self.backend
    }

    /// All registered processes.
    pub async fn get_processes(&self) -> Result<Vec<ProcessDescriptor>> {
        Ok(self.registry.list_processes().await?)
    }

    /// One registered process.
    pub async fn get_process(&self, process_id: &str) -> Result<ProcessDescriptor> {
        self.registry
            .get_process(process_id)
            .await?
            .ok_or_else(|| ServiceError::ProcessNotFound(process_id.to_string()))
    }

    /// Register a process and prepare the backend for it.
    #[instrument(skip(self, process), fields(process_id = %process.id))]
    pub async fn deploy_process(&self, process: ProcessDescriptor) -> Result<ProcessDescriptor> {
        let deployed = self.backend.deploy(&process).await?;
        self.registry.deploy_process(&deployed).await?;
        info!(backend = self.backend.backend_type(), "Process deployed");
        Ok(deployed)
    }

    /// Fetch a JSON process description and register it.
    #[instrument(skip(self))]
    pub async fn deploy_process_from_url(&self, url: &str) -> Result<ProcessDescriptor> {
        let fetch_error = |message: String| ServiceError::Fetch {
            url: url.to_string(),
            message,
        };

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(fetch_error(format!("HTTP {}", response.status())));
        }

        let process: ProcessDescriptor = response
            .json()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        debug!(process_id = %process.id, "Fetched process description");
        self.deploy_process(process).await
    }

    /// Remove a process from the registry and the backend.
    #[instrument(skip(self))]
    pub async fn undeploy_process(&self, process_id: &str) -> Result<ProcessDescriptor> {
        let process = match self.registry.undeploy_process(process_id).await {
            Ok(process) => process,
            Err(RegistryError::ProcessNotFound(id)) => return Err(ServiceError::ProcessNotFound(id)),
            Err(e) => return Err(e.into()),
        };
        let process = self.backend.undeploy(&process).await?;
        info!("Process undeployed");
        Ok(process)
    }

    /// Submit an execution of a registered process.
    #[instrument(skip(self, request), fields(inputs = request.inputs.len()))]
    pub async fn execute(&self, process_id: &str, request: ExecutionRequest) -> Result<JobInfo> {
        let process = self.get_process(process_id).await?;

        let required = request.mode.required_job_control();
        if !process.supports(required) {
            return Err(ServiceError::UnsupportedJobControl {
                process_id: process_id.to_string(),
                option: required,
            });
        }

        let mut request = request;
        request.process_id = process.id.clone();

        let handle = self.backend.submit(&process, &request).await?;
        let job = JobRecord::accepted(handle);
        if let Err(e) = self.registry.insert_job(&job).await {
            error!(
                job_id = %job.job_id,
                locator = %job.handle.locator,
                error = %e,
                "Failed to record submitted job"
            );
            if let Err(dismiss_err) = self.backend.dismiss(&job.handle).await {
                warn!(job_id = %job.job_id, error = %dismiss_err, "Failed to dismiss unrecorded job");
            }
            return Err(ServiceError::JobNotRecorded {
                job_id: job.job_id,
                source: e,
            });
        }

        info!(job_id = %job.job_id, "Job accepted");
        Ok(JobInfo::from(&job))
    }

    /// Jobs of a process with their last recorded status.
    pub async fn get_jobs(&self, process_id: &str) -> Result<Vec<JobInfo>> {
        let jobs = self.registry.list_jobs(process_id).await?;
        Ok(jobs.iter().map(JobInfo::from).collect())
    }

    /// Current status of a job.
    ///
    /// Terminal states are answered from the registry; anything else is
    /// reconciled against the backend and the observation persisted.
    #[instrument(skip(self))]
    pub async fn get_job(&self, process_id: &str, job_id: &str) -> Result<JobInfo> {
        let mut job = self.load_job(process_id, job_id).await?;
        job.status = self.refresh_status(&job).await?;
        Ok(JobInfo::from(&job))
    }

    /// Cancel a job that has not finished.
    ///
    /// The job is reconciled first, so a workload the backend already
    /// reports as finished is never turned into `dismissed`.
    #[instrument(skip(self))]
    pub async fn dismiss_job(&self, process_id: &str, job_id: &str) -> Result<JobInfo> {
        let process = self.get_process(process_id).await?;
        if !process.supports(JobControlOption::Dismiss) {
            return Err(ServiceError::UnsupportedJobControl {
                process_id: process_id.to_string(),
                option: JobControlOption::Dismiss,
            });
        }

        let mut job = self.load_job(process_id, job_id).await?;
        match self.refresh_status(&job).await {
            Ok(status) => job.status = status,
            // Workload already gone: dismissal still records the outcome.
            Err(ServiceError::Backend(BackendError::ExecutionNotFound(_))) => {}
            Err(e) => return Err(e),
        }
        if job.status.is_terminal() {
            return Err(ServiceError::JobAlreadyTerminal {
                job_id: job_id.to_string(),
                state: job.status,
            });
        }

        job.status = self.backend.dismiss(&job.handle).await?;
        self.registry
            .update_job_status(process_id, job_id, job.status)
            .await?;

        info!(status = %job.status, "Job dismissed");
        Ok(JobInfo::from(&job))
    }

    /// Result locations of a successful job.
    #[instrument(skip(self))]
    pub async fn get_job_results(&self, process_id: &str, job_id: &str) -> Result<ExecutionResults> {
        let job = self.load_job(process_id, job_id).await?;
        let status = self.refresh_status(&job).await?;
        if status != ExecutionState::Successful {
            return Err(ServiceError::ResultsUnavailable {
                job_id: job_id.to_string(),
                state: status,
            });
        }
        Ok(self.backend.results(&job.handle).await?)
    }

    async fn load_job(&self, process_id: &str, job_id: &str) -> Result<JobRecord> {
        self.registry
            .get_job(process_id, job_id)
            .await?
            .ok_or_else(|| ServiceError::JobNotFound {
                process_id: process_id.to_string(),
                job_id: job_id.to_string(),
            })
    }

    async fn refresh_status(&self, job: &JobRecord) -> Result<ExecutionState> {
        if job.status.is_terminal() {
            return Ok(job.status);
        }

        let observed = self.backend.state(&job.handle).await?;
        // A running job never goes back to accepted.
        if job.status == ExecutionState::Running && observed == ExecutionState::Accepted {
            debug!(job_id = %job.job_id, "Ignoring accepted observation of a running job");
            return Ok(job.status);
        }

        if observed != job.status {
            if let Err(e) = self
                .registry
                .update_job_status(&job.process_id, &job.job_id, observed)
                .await
            {
                if observed.is_terminal() {
                    error!(job_id = %job.job_id, status = %observed, error = %e, "Failed to record terminal job status");
                } else {
                    warn!(job_id = %job.job_id, error = %e, "Failed to record job status");
                }
            }
            debug!(job_id = %job.job_id, from = %job.status, to = %observed, "Job status changed");
        }
        Ok(observed)
    }
}
