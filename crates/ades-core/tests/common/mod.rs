// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared fixtures for ades-core integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use ades_core::backend::MockBackend;
use ades_core::registry::MemoryRegistry;
use ades_core::{
    ExecutionInputs, ExecutionRequest, InputValue, JobControlOption, ProcessDescriptor,
    TransmissionMode, WpsService,
};

/// A fully populated process descriptor.
pub fn sample_process(id: &str) -> ProcessDescriptor {
    ProcessDescriptor {
        id: id.to_string(),
        title: format!("{} title", id),
        abstract_text: "Runs a CWL workflow".to_string(),
        keywords: vec!["cwl".to_string(), "demo, with comma".to_string()],
        ows_context_url: format!("https://example.com/{}.cwl", id),
        process_version: "1.2.0".to_string(),
        job_control_options: vec![JobControlOption::AsyncExecute, JobControlOption::Dismiss],
        output_transmission: vec![TransmissionMode::Reference],
        immediate_deployment: true,
        execution_unit: "docker.io/example/app:1".to_string(),
    }
}

/// An asynchronous request with one literal and one secret input.
pub fn sample_request(process_id: &str) -> ExecutionRequest {
    ExecutionRequest::new(
        process_id,
        ExecutionInputs::new()
            .with("infile", InputValue::literal("file.txt"))
            .with("aws_access_key_id", InputValue::SecretRef),
    )
}

/// Service over an in-memory registry and a mock backend.
pub struct ServiceContext {
    pub service: WpsService,
    pub backend: Arc<MockBackend>,
    pub registry: Arc<MemoryRegistry>,
}

impl ServiceContext {
    pub fn new() -> Self {
        Self::with_backend(MockBackend::new())
    }

    pub fn with_backend(backend: MockBackend) -> Self {
        let backend = Arc::new(backend);
        let registry = Arc::new(MemoryRegistry::new());
        let service = WpsService::new(registry.clone(), backend.clone());
        Self {
            service,
            backend,
            registry,
        }
    }
}
