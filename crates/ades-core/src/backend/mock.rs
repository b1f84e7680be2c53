// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock backend for testing.
//!
//! Simulates executions in memory. Tests drive state transitions explicitly.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use super::traits::*;
use crate::execution::{
    ExecutionHandle, ExecutionRequest, ExecutionResults, ExecutionState, ResultLink,
};
use crate::process::ProcessDescriptor;

#[derive(Debug, Clone)]
struct MockExecution {
    state: ExecutionState,
    request: ExecutionRequest,
}

/// Mock backend for testing.
pub struct MockBackend {
    executions: Arc<Mutex<HashMap<String, MockExecution>>>,
    counter: AtomicU64,
    /// If true, `submit` fails with a control-plane error.
    pub fail_submit: bool,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend.
    pub fn new() -> Self {
        Self {
            executions: Arc::new(Mutex::new(HashMap::new())),
            counter: AtomicU64::new(0),
            fail_submit: false,
        }
    }

    /// Create a mock backend whose submissions always fail.
    pub fn failing() -> Self {
        Self {
            fail_submit: true,
            ..Self::new()
        }
    }

    /// Force an execution into a state.
    pub async fn set_state(&self, execution_id: &str, state: ExecutionState) {
        let mut executions = self.executions.lock().await;
        if let Some(execution) = executions.get_mut(execution_id) {
            execution.state = state;
        }
    }

    /// The request an execution was submitted with.
    pub async fn submitted_request(&self, execution_id: &str) -> Option<ExecutionRequest> {
        let executions = self.executions.lock().await;
        executions.get(execution_id).map(|e| e.request.clone())
    }

    /// Number of submitted executions.
    pub async fn execution_count(&self) -> usize {
        self.executions.lock().await.len()
    }
}

#[async_trait]
impl ExecutionBackend for MockBackend {
    fn backend_type(&self) -> &'static str {
        "mock"
    }

    async fn deploy(&self, process: &ProcessDescriptor) -> Result<ProcessDescriptor> {
        Ok(process.clone())
    }

    async fn undeploy(&self, process: &ProcessDescriptor) -> Result<ProcessDescriptor> {
        Ok(process.clone())
    }

    async fn submit(
        &self,
        process: &ProcessDescriptor,
        request: &ExecutionRequest,
    ) -> Result<ExecutionHandle> {
        if self.fail_submit {
            return Err(BackendError::ControlPlane {
                operation: "submit".to_string(),
                execution_id: "-".to_string(),
                message: "Mock failure".to_string(),
            });
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let execution_id = format!("mock{:08}", n);

        self.executions.lock().await.insert(
            execution_id.clone(),
            MockExecution {
                state: ExecutionState::Accepted,
                request: request.clone(),
            },
        );

        Ok(ExecutionHandle {
            execution_id,
            process_id: process.id.clone(),
            backend: self.backend_type().to_string(),
            locator: serde_json::Value::Null,
            created_at: Utc::now(),
            backend_response: serde_json::Value::Null,
        })
    }

    async fn dismiss(&self, handle: &ExecutionHandle) -> Result<ExecutionState> {
        let mut executions = self.executions.lock().await;
        let execution = executions
            .get_mut(&handle.execution_id)
            .ok_or_else(|| BackendError::ExecutionNotFound(handle.execution_id.clone()))?;
        execution.state = ExecutionState::Dismissed;
        Ok(ExecutionState::Dismissed)
    }

    async fn state(&self, handle: &ExecutionHandle) -> Result<ExecutionState> {
        let executions = self.executions.lock().await;
        executions
            .get(&handle.execution_id)
            .map(|e| e.state)
            .ok_or_else(|| BackendError::ExecutionNotFound(handle.execution_id.clone()))
    }

    async fn results(&self, handle: &ExecutionHandle) -> Result<ExecutionResults> {
        let state = self.state(handle).await?;
        if state != ExecutionState::Successful {
            return Err(BackendError::ResultsUnavailable {
                execution_id: handle.execution_id.clone(),
                state,
            });
        }
        Ok(ExecutionResults {
            links: vec![ResultLink {
                href: format!("mock://{}/output.json", handle.execution_id),
                rel: "result".to_string(),
                media_type: "application/json".to_string(),
                title: "output".to_string(),
            }],
        })
    }
}
