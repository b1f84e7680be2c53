// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared fixtures for ades-environment integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use ades_core::execution::{ExecutionHandle, ExecutionInputs, ExecutionRequest, InputValue};
use ades_core::process::ProcessDescriptor;
use ades_environment::config::Config;
use ades_environment::naming::{IdGenerator, generate_id};
use ades_environment::resources::{JobCondition, JobStatus};
use ades_environment::{K8sBackend, MockControlPlane};

pub const NAMESPACE: &str = "soamc";

/// Configuration with defaults plus the given overrides.
pub fn test_config(overrides: &[(&str, &str)]) -> Config {
    let mut vars: Vec<(String, String)> = vec![
        ("KUBERNETES_API_URL".into(), "https://127.0.0.1:6443".into()),
        ("KUBERNETES_TOKEN".into(), "test-token".into()),
    ];
    vars.extend(overrides.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    Config::from_lookup(|key: &str| {
        vars.iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    })
    .expect("test config")
}

/// Hands out fixed identifiers first, then random ones.
pub struct SequenceIds {
    ids: Mutex<VecDeque<String>>,
}

impl SequenceIds {
    pub fn new(ids: &[&str]) -> Self {
        Self {
            ids: Mutex::new(ids.iter().map(|s| s.to_string()).collect()),
        }
    }
}

impl IdGenerator for SequenceIds {
    fn next_id(&self) -> String {
        self.ids
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| generate_id(12))
    }
}

/// The process of the reference scenario.
pub fn scenario_process() -> ProcessDescriptor {
    ProcessDescriptor::new("p1", "https://x/app.cwl")
}

/// The request of the reference scenario.
pub fn scenario_request() -> ExecutionRequest {
    ExecutionRequest::new(
        "p1",
        ExecutionInputs::new()
            .with("infile", InputValue::literal("file.txt"))
            .with("aws_access_key_id", InputValue::SecretRef),
    )
}

/// Backend over an in-memory control plane.
pub struct BackendContext {
    pub backend: K8sBackend,
    pub control_plane: MockControlPlane,
}

impl BackendContext {
    pub fn new() -> Self {
        Self::with_config(test_config(&[]))
    }

    pub fn with_config(config: Config) -> Self {
        let control_plane = MockControlPlane::new();
        let backend = K8sBackend::new(Arc::new(control_plane.clone()), &config);
        Self {
            backend,
            control_plane,
        }
    }

    pub fn with_ids(mut self, ids: &[&str]) -> Self {
        self.backend = self
            .backend
            .with_id_generator(Arc::new(SequenceIds::new(ids)));
        self
    }

    /// Job name recorded in a handle.
    pub fn job_name(handle: &ExecutionHandle) -> String {
        handle.locator["job_name"]
            .as_str()
            .unwrap_or_default()
            .to_string()
    }

    /// Set the native status of the handle's job.
    pub async fn set_status(&self, handle: &ExecutionHandle, status: JobStatus) {
        let found = self
            .control_plane
            .set_job_status(NAMESPACE, &Self::job_name(handle), status)
            .await;
        assert!(found, "job of {} not found", handle.execution_id);
    }

    pub async fn complete(&self, handle: &ExecutionHandle) {
        self.set_status(
            handle,
            JobStatus {
                conditions: Some(vec![JobCondition::new("Complete", true)]),
                succeeded: Some(1),
                ..Default::default()
            },
        )
        .await;
    }
}
