// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Kubernetes execution backend.
//!
//! Runs each execution as a CWL runner job with three dedicated volume
//! claims. All objects of one execution are named from one generated
//! identifier; on a name collision the identifier is re-rolled and the whole
//! sequence restarts.

use std::sync::Arc;

use ades_core::backend::{BackendError, ExecutionBackend, Result};
use ades_core::execution::{
    ExecutionHandle, ExecutionRequest, ExecutionResults, ExecutionState, ResultLink,
};
use ades_core::process::ProcessDescriptor;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::builder::{
    ExecutionBuilder, K8sLocator, OUTPUT_MOUNT, STDERR_FILE, STDOUT_FILE, USAGE_FILE,
};
use crate::config::{CleanupPolicy, Config};
use crate::control_plane::{ControlPlane, ControlPlaneError, ResourceKind};
use crate::naming::{ExecutionNames, IdGenerator, RandomIds};
use crate::provisioning::OBJECT_STORE_SECRET;
use crate::reconciler::StatusReconciler;

/// Backend type identifier stored in execution handles.
pub const BACKEND_TYPE: &str = "k8s";

/// Why one submission attempt stopped.
enum AttemptError {
    /// An object name was taken; retry with a fresh identifier.
    Collision(String),
    Fatal(BackendError),
}

/// Execution backend on a Kubernetes cluster.
pub struct K8sBackend {
    control_plane: Arc<dyn ControlPlane>,
    builder: ExecutionBuilder,
    reconciler: StatusReconciler,
    ids: Arc<dyn IdGenerator>,
    max_name_attempts: u32,
    cleanup: CleanupPolicy,
}

impl K8sBackend {
    /// Create a backend from configuration.
    pub fn new(control_plane: Arc<dyn ControlPlane>, config: &Config) -> Self {
        let builder = ExecutionBuilder::new(
            &config.namespace,
            &config.service_account,
            config.runner.clone(),
        )
        .with_env_secret(OBJECT_STORE_SECRET);

        Self {
            reconciler: StatusReconciler::new(control_plane.clone()),
            control_plane,
            builder,
            ids: Arc::new(RandomIds::default()),
            max_name_attempts: config.max_name_attempts.max(1),
            cleanup: config.cleanup,
        }
    }

    /// Replace the identifier source.
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn namespace(&self) -> &str {
        self.builder.namespace()
    }

    /// Create the volumes and the job of one identifier.
    ///
    /// Everything created is appended to `created`, so the caller can remove
    /// it when the attempt does not succeed.
    async fn try_submit(
        &self,
        names: &ExecutionNames,
        request: &ExecutionRequest,
        workflow_url: &str,
        created: &mut Vec<(ResourceKind, String)>,
    ) -> std::result::Result<Value, AttemptError> {
        let namespace = self.namespace();
        let id = &names.execution_id;

        for claim in self.builder.volume_claims(names) {
            self.control_plane
                .create_persistent_volume_claim(namespace, &claim)
                .await
                .map_err(|e| attempt_error(e, "create_persistent_volume_claim", id))?;
            debug!(execution_id = %id, volume = %claim.metadata.name, "Volume claim created");
            created.push((ResourceKind::PersistentVolumeClaim, claim.metadata.name));
        }

        let job = self.builder.job(names, &request.inputs, workflow_url);
        let response = self
            .control_plane
            .create_job(namespace, &job)
            .await
            .map_err(|e| attempt_error(e, "create_job", id))?;
        created.push((ResourceKind::Job, job.metadata.name));

        Ok(response)
    }

    /// Best-effort removal of objects, newest first.
    async fn remove(&self, execution_id: &str, objects: &[(ResourceKind, String)]) {
        let namespace = self.namespace();
        for (kind, name) in objects.iter().rev() {
            let result = match kind {
                ResourceKind::Job => self.control_plane.delete_job(namespace, name).await,
                ResourceKind::PersistentVolumeClaim => {
                    self.control_plane
                        .delete_persistent_volume_claim(namespace, name)
                        .await
                }
                _ => Ok(()),
            };
            match result {
                Ok(()) => debug!(execution_id, %kind, %name, "Removed"),
                Err(e) if e.is_not_found() => {}
                Err(e) => warn!(execution_id, %kind, %name, error = %e, "Failed to remove"),
            }
        }
    }

    fn locator(&self, handle: &ExecutionHandle) -> Result<K8sLocator> {
        if handle.backend != BACKEND_TYPE {
            return Err(BackendError::InvalidHandle(format!(
                "execution {} belongs to backend '{}'",
                handle.execution_id, handle.backend
            )));
        }
        K8sLocator::from_handle(handle)
    }
}

fn attempt_error(err: ControlPlaneError, operation: &str, execution_id: &str) -> AttemptError {
    match err {
        ControlPlaneError::AlreadyExists { name, .. } => AttemptError::Collision(name),
        other => AttemptError::Fatal(other.into_backend(operation, execution_id)),
    }
}

fn result_link(locator: &K8sLocator, file: &str, rel: &str, media_type: &str) -> ResultLink {
    ResultLink {
        href: format!(
            "pvc://{}/{}/{}",
            locator.namespace, locator.output_volume, file
        ),
        rel: rel.to_string(),
        media_type: media_type.to_string(),
        title: format!("{}/{}", OUTPUT_MOUNT, file),
    }
}

#[async_trait]
impl ExecutionBackend for K8sBackend {
    fn backend_type(&self) -> &'static str {
        BACKEND_TYPE
    }

    #[instrument(skip(self, process), fields(process_id = %process.id))]
    async fn deploy(&self, process: &ProcessDescriptor) -> Result<ProcessDescriptor> {
        if process.id.is_empty() {
            return Err(BackendError::InvalidProcess {
                process_id: String::new(),
                reason: "empty process identifier".to_string(),
            });
        }
        url::Url::parse(&process.ows_context_url).map_err(|e| BackendError::InvalidProcess {
            process_id: process.id.clone(),
            reason: format!("invalid owsContextURL '{}': {}", process.ows_context_url, e),
        })?;

        info!(workflow = %process.ows_context_url, "Process deployed");
        Ok(process.clone())
    }

    #[instrument(skip(self, process), fields(process_id = %process.id))]
    async fn undeploy(&self, process: &ProcessDescriptor) -> Result<ProcessDescriptor> {
        // Executions keep their own objects; nothing is held per process.
        info!("Process undeployed");
        Ok(process.clone())
    }

    #[instrument(skip(self, process, request), fields(process_id = %process.id, inputs = request.inputs.len()))]
    async fn submit(
        &self,
        process: &ProcessDescriptor,
        request: &ExecutionRequest,
    ) -> Result<ExecutionHandle> {
        let mut last_collision = String::new();

        for attempt in 1..=self.max_name_attempts {
            let names = ExecutionNames::from_id(self.ids.next_id());
            let mut created = Vec::new();

            match self
                .try_submit(&names, request, &process.ows_context_url, &mut created)
                .await
            {
                Ok(response) => {
                    let locator = K8sLocator::new(self.namespace(), &names);
                    info!(
                        execution_id = %names.execution_id,
                        job = %names.job,
                        attempt,
                        "Execution submitted"
                    );
                    return Ok(ExecutionHandle {
                        execution_id: names.execution_id.clone(),
                        process_id: process.id.clone(),
                        backend: BACKEND_TYPE.to_string(),
                        locator: serde_json::to_value(&locator)
                            .map_err(|e| BackendError::Other(e.to_string()))?,
                        created_at: Utc::now(),
                        backend_response: response,
                    });
                }
                Err(AttemptError::Collision(name)) => {
                    warn!(
                        execution_id = %names.execution_id,
                        %name,
                        attempt,
                        "Name collision, retrying with a fresh identifier"
                    );
                    self.remove(&names.execution_id, &created).await;
                    last_collision = name;
                }
                Err(AttemptError::Fatal(e)) => {
                    error!(execution_id = %names.execution_id, error = %e, "Submission failed");
                    if self.cleanup.rollback_on_failure {
                        self.remove(&names.execution_id, &created).await;
                    }
                    return Err(e);
                }
            }
        }

        Err(BackendError::NameCollision {
            name: last_collision,
            attempts: self.max_name_attempts,
        })
    }

    #[instrument(skip(self, handle), fields(execution_id = %handle.execution_id))]
    async fn dismiss(&self, handle: &ExecutionHandle) -> Result<ExecutionState> {
        let locator = self.locator(handle)?;

        match self
            .control_plane
            .delete_job(&locator.namespace, &locator.job_name)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                warn!(job = %locator.job_name, "Job already gone");
            }
            Err(e) => return Err(e.into_backend("delete_job", &handle.execution_id)),
        }

        if self.cleanup.delete_volumes_on_dismiss {
            let volumes: Vec<_> = locator
                .volumes()
                .iter()
                .map(|v| (ResourceKind::PersistentVolumeClaim, v.to_string()))
                .collect();
            self.remove(&handle.execution_id, &volumes).await;
        }

        info!(job = %locator.job_name, "Execution dismissed");
        Ok(ExecutionState::Dismissed)
    }

    #[instrument(skip(self, handle), fields(execution_id = %handle.execution_id))]
    async fn state(&self, handle: &ExecutionHandle) -> Result<ExecutionState> {
        let locator = self.locator(handle)?;
        self.reconciler
            .reconcile(&handle.execution_id, &locator)
            .await
    }

    #[instrument(skip(self, handle), fields(execution_id = %handle.execution_id))]
    async fn results(&self, handle: &ExecutionHandle) -> Result<ExecutionResults> {
        let locator = self.locator(handle)?;
        let state = self
            .reconciler
            .reconcile(&handle.execution_id, &locator)
            .await?;

        if state != ExecutionState::Successful {
            return Err(BackendError::ResultsUnavailable {
                execution_id: handle.execution_id.clone(),
                state,
            });
        }

        Ok(ExecutionResults {
            links: vec![
                result_link(&locator, STDOUT_FILE, "result", "application/json"),
                result_link(&locator, USAGE_FILE, "usage", "application/json"),
                result_link(&locator, STDERR_FILE, "log", "text/plain"),
            ],
        })
    }
}
