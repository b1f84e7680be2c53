// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Execution resource builder.
//!
//! Turns one execution request into the objects that run it: three volume
//! claims and a batch job running the CWL runner with the volumes mounted
//! and the inputs passed as command-line flags.
//!
//! Runner layout inside the container:
//!
//! ```text
//! /calrissian/input-data    input volume (read-only)
//! /calrissian/tmpout        intermediate step outputs
//! /calrissian/output-data   final outputs, stdout, stderr and usage report
//! ```

use ades_core::backend::{BackendError, Result};
use ades_core::execution::{ExecutionHandle, ExecutionInputs, InputValue};
use serde::{Deserialize, Serialize};

use crate::config::RunnerConfig;
use crate::naming::ExecutionNames;
use crate::resources::{
    Container, EnvFromSource, EnvVar, Job, JobSpec, ObjectMeta, PersistentVolumeClaim, PodSpec,
    PodTemplateSpec, SecretEnvSource, Volume, VolumeMount,
};

pub const CONTAINER_NAME: &str = "calrissian-job";
pub const RUNNER_COMMAND: &str = "calrissian";

pub const INPUT_MOUNT: &str = "/calrissian/input-data";
pub const TMPOUT_MOUNT: &str = "/calrissian/tmpout";
pub const OUTPUT_MOUNT: &str = "/calrissian/output-data";

/// File names the runner writes to the output volume.
pub const STDOUT_FILE: &str = "docker-output.json";
pub const STDERR_FILE: &str = "docker-stderr.log";
pub const USAGE_FILE: &str = "docker-usage.json";

/// Where an execution's objects live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct K8sLocator {
    pub namespace: String,
    pub job_name: String,
    pub input_volume: String,
    pub tmpout_volume: String,
    pub output_volume: String,
}

impl K8sLocator {
    pub fn new(namespace: &str, names: &ExecutionNames) -> Self {
        Self {
            namespace: namespace.to_string(),
            job_name: names.job.clone(),
            input_volume: names.input_volume.clone(),
            tmpout_volume: names.tmpout_volume.clone(),
            output_volume: names.output_volume.clone(),
        }
    }

    /// Decode the locator stored in a handle.
    pub fn from_handle(handle: &ExecutionHandle) -> Result<Self> {
        serde_json::from_value(handle.locator.clone()).map_err(|e| {
            BackendError::InvalidHandle(format!(
                "execution {}: bad locator: {}",
                handle.execution_id, e
            ))
        })
    }

    pub fn volumes(&self) -> [&str; 3] {
        [&self.input_volume, &self.tmpout_volume, &self.output_volume]
    }
}

/// Runner arguments for one execution.
///
/// Fixed flags first, then one flag per input in request order, then the
/// workflow URL as the only positional argument. A secret reference becomes
/// `$(key)`, which the kubelet expands from the container environment (the
/// object-store secret is mounted with `envFrom`).
pub fn runner_args(runner: &RunnerConfig, inputs: &ExecutionInputs, workflow_url: &str) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "--debug".into(),
        "--stdout".into(),
        format!("{}/{}", OUTPUT_MOUNT, STDOUT_FILE),
        "--stderr".into(),
        format!("{}/{}", OUTPUT_MOUNT, STDERR_FILE),
        "--max-ram".into(),
        runner.max_ram.clone(),
        "--max-cores".into(),
        runner.max_cores.to_string(),
        "--tmp-outdir-prefix".into(),
        format!("{}/", TMPOUT_MOUNT),
        "--outdir".into(),
        format!("{}/", OUTPUT_MOUNT),
        "--usage-report".into(),
        format!("{}/{}", OUTPUT_MOUNT, USAGE_FILE),
    ];

    for (key, value) in inputs.iter() {
        args.push(format!("--{}", key));
        match value {
            InputValue::SecretRef => args.push(format!("$({})", key)),
            InputValue::Literal(v) => args.push(v.clone()),
        }
    }

    args.push(workflow_url.to_string());
    args
}

/// Builds the volume claims and job of an execution.
#[derive(Debug, Clone)]
pub struct ExecutionBuilder {
    namespace: String,
    service_account: String,
    runner: RunnerConfig,
    env_secrets: Vec<String>,
}

impl ExecutionBuilder {
    pub fn new(
        namespace: impl Into<String>,
        service_account: impl Into<String>,
        runner: RunnerConfig,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            service_account: service_account.into(),
            runner,
            env_secrets: Vec::new(),
        }
    }

    /// Expose every key of `secret` as an environment variable of the runner.
    pub fn with_env_secret(mut self, secret: impl Into<String>) -> Self {
        self.env_secrets.push(secret.into());
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Input, tmpout and output claims, in creation order.
    pub fn volume_claims(&self, names: &ExecutionNames) -> [PersistentVolumeClaim; 3] {
        let claim = |name: &str, access_modes: &[&str]| {
            PersistentVolumeClaim::new(
                ObjectMeta::namespaced(&self.namespace, name).for_execution(&names.execution_id),
                access_modes,
                &self.runner.volume_size,
                self.runner.storage_class.clone(),
            )
        };
        [
            claim(&names.input_volume, &["ReadWriteOnce", "ReadOnlyMany"]),
            claim(&names.tmpout_volume, &["ReadWriteMany"]),
            claim(&names.output_volume, &["ReadWriteMany"]),
        ]
    }

    /// The runner job.
    pub fn job(&self, names: &ExecutionNames, inputs: &ExecutionInputs, workflow_url: &str) -> Job {
        let container = Container {
            name: CONTAINER_NAME.to_string(),
            image: self.runner.image.clone(),
            image_pull_policy: Some("Always".to_string()),
            command: vec![RUNNER_COMMAND.to_string()],
            args: runner_args(&self.runner, inputs, workflow_url),
            env: vec![EnvVar::from_field("CALRISSIAN_POD_NAME", "metadata.name")],
            env_from: self
                .env_secrets
                .iter()
                .map(|name| EnvFromSource {
                    secret_ref: Some(SecretEnvSource {
                        name: name.clone(),
                        optional: Some(true),
                    }),
                })
                .collect(),
            volume_mounts: vec![
                VolumeMount {
                    name: names.input_volume.clone(),
                    mount_path: INPUT_MOUNT.to_string(),
                    read_only: Some(true),
                },
                VolumeMount {
                    name: names.tmpout_volume.clone(),
                    mount_path: TMPOUT_MOUNT.to_string(),
                    read_only: None,
                },
                VolumeMount {
                    name: names.output_volume.clone(),
                    mount_path: OUTPUT_MOUNT.to_string(),
                    read_only: None,
                },
            ],
        };

        let pod_meta = ObjectMeta::default().for_execution(&names.execution_id);
        let spec = JobSpec {
            template: PodTemplateSpec {
                metadata: Some(pod_meta),
                spec: PodSpec {
                    containers: vec![container],
                    restart_policy: "Never".to_string(),
                    service_account_name: Some(self.service_account.clone()),
                    volumes: vec![
                        Volume::claim(&names.input_volume, true),
                        Volume::claim(&names.tmpout_volume, false),
                        Volume::claim(&names.output_volume, false),
                    ],
                },
            },
            backoff_limit: Some(0),
        };

        Job::new(
            ObjectMeta::namespaced(&self.namespace, &names.job).for_execution(&names.execution_id),
            spec,
        )
    }
}
