// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Job status reconciliation.
//!
//! Maps the native job status to an [`ExecutionState`]. First match wins:
//!
//! 1. a true `Complete` condition: successful
//! 2. a true `Failed` condition: failed
//! 3. any condition of another type: unrecognized-status error
//! 4. active pods: running
//! 5. otherwise: accepted
//!
//! `Complete`/`Failed` conditions that are not true are skipped.

use std::sync::Arc;

use ades_core::backend::{BackendError, Result};
use ades_core::execution::ExecutionState;
use tracing::debug;

use crate::builder::K8sLocator;
use crate::control_plane::ControlPlane;
use crate::resources::JobStatus;

const COMPLETE: &str = "Complete";
const FAILED: &str = "Failed";

/// Execution state of a job status snapshot.
pub fn execution_state(workload: &str, status: Option<&JobStatus>) -> Result<ExecutionState> {
    let Some(status) = status else {
        return Ok(ExecutionState::Accepted);
    };
    let conditions = status.conditions.as_deref().unwrap_or_default();

    if conditions
        .iter()
        .any(|c| c.condition_type == COMPLETE && c.is_true())
    {
        return Ok(ExecutionState::Successful);
    }
    if conditions
        .iter()
        .any(|c| c.condition_type == FAILED && c.is_true())
    {
        return Ok(ExecutionState::Failed);
    }
    if let Some(other) = conditions
        .iter()
        .find(|c| c.condition_type != COMPLETE && c.condition_type != FAILED)
    {
        return Err(BackendError::UnrecognizedStatus {
            workload: workload.to_string(),
            detail: format!(
                "condition {}={} (reason: {})",
                other.condition_type,
                other.status,
                other.reason.as_deref().unwrap_or("none")
            ),
        });
    }

    if status.active.unwrap_or(0) > 0 {
        Ok(ExecutionState::Running)
    } else {
        Ok(ExecutionState::Accepted)
    }
}

/// Reads jobs from the control plane and maps their status.
pub struct StatusReconciler {
    control_plane: Arc<dyn ControlPlane>,
}

impl StatusReconciler {
    pub fn new(control_plane: Arc<dyn ControlPlane>) -> Self {
        Self { control_plane }
    }

    /// Current state of the execution at `locator`.
    pub async fn reconcile(&self, execution_id: &str, locator: &K8sLocator) -> Result<ExecutionState> {
        let job = self
            .control_plane
            .read_job(&locator.namespace, &locator.job_name)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    BackendError::ExecutionNotFound(execution_id.to_string())
                } else {
                    e.into_backend("read_job", execution_id)
                }
            })?;

        let state = execution_state(&locator.job_name, job.status.as_ref())?;
        debug!(execution_id, job = %locator.job_name, %state, "Reconciled job status");
        Ok(state)
    }
}
