// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Kubernetes object models.
//!
//! Only the fields this backend writes or reads are modelled. Every struct
//! tolerates missing fields on read so that full API responses deserialize.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label carrying the execution identifier on per-execution resources.
pub const EXECUTION_ID_LABEL: &str = "ades.wps/execution-id";

/// Label marking resources created by this backend.
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Value of [`MANAGED_BY_LABEL`].
pub const MANAGED_BY: &str = "ades";

/// Standard object metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectMeta {
    /// Object name.
    pub name: String,
    /// Namespace; `None` for cluster-scoped objects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Labels.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Server-assigned unique id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// RFC 3339 creation time, set by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
}

impl ObjectMeta {
    /// Metadata for a cluster-scoped object.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Metadata for a namespaced object.
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
            ..Default::default()
        }
    }

    /// Add a label.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Label the object as belonging to one execution.
    pub fn for_execution(self, execution_id: &str) -> Self {
        self.with_label(MANAGED_BY_LABEL, MANAGED_BY)
            .with_label(EXECUTION_ID_LABEL, execution_id)
    }
}

/// `v1/Namespace`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Namespace {
    /// API group and version.
    pub api_version: String,
    /// Object kind.
    pub kind: String,
    /// Object metadata.
    pub metadata: ObjectMeta,
}

impl Namespace {
    /// Namespace labelled as managed by this backend.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "Namespace".to_string(),
            metadata: ObjectMeta::named(name).with_label(MANAGED_BY_LABEL, MANAGED_BY),
        }
    }
}

/// `v1/Secret`. `data` values are base64-encoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Secret {
    /// API group and version.
    pub api_version: String,
    /// Object kind.
    pub kind: String,
    /// Object metadata.
    pub metadata: ObjectMeta,
    /// Secret type, `Opaque` here.
    #[serde(rename = "type")]
    pub secret_type: String,
    /// Whether the data can be changed after creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub immutable: Option<bool>,
    /// Base64-encoded values by key.
    pub data: BTreeMap<String, String>,
}

impl Secret {
    /// Immutable opaque secret holding already base64-encoded `data`.
    pub fn immutable_opaque(
        namespace: &str,
        name: impl Into<String>,
        data: BTreeMap<String, String>,
    ) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "Secret".to_string(),
            metadata: ObjectMeta::namespaced(namespace, name)
                .with_label(MANAGED_BY_LABEL, MANAGED_BY),
            secret_type: "Opaque".to_string(),
            immutable: Some(true),
            data,
        }
    }
}

/// One RBAC rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyRule {
    /// API groups; `""` is the core group.
    pub api_groups: Vec<String>,
    /// Resource names, e.g. `pods/log`.
    pub resources: Vec<String>,
    /// Allowed verbs.
    pub verbs: Vec<String>,
}

impl PolicyRule {
    /// Rule over core-group resources.
    pub fn core(resources: &[&str], verbs: &[&str]) -> Self {
        Self {
            api_groups: vec![String::new()],
            resources: resources.iter().map(|r| r.to_string()).collect(),
            verbs: verbs.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// `rbac.authorization.k8s.io/v1/Role`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Role {
    /// API group and version.
    pub api_version: String,
    /// Object kind.
    pub kind: String,
    /// Object metadata.
    pub metadata: ObjectMeta,
    /// Granted rules.
    pub rules: Vec<PolicyRule>,
}

impl Role {
    pub fn new(namespace: &str, name: impl Into<String>, rules: Vec<PolicyRule>) -> Self {
        Self {
            api_version: "rbac.authorization.k8s.io/v1".to_string(),
            kind: "Role".to_string(),
            metadata: ObjectMeta::namespaced(namespace, name)
                .with_label(MANAGED_BY_LABEL, MANAGED_BY),
            rules,
        }
    }
}

/// Subject of a role binding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Subject {
    /// Subject kind, e.g. `ServiceAccount`.
    pub kind: String,
    /// Subject name.
    pub name: String,
    /// Namespace of a service-account subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Role referenced by a binding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleRef {
    /// API group of the role.
    pub api_group: String,
    /// `Role` or `ClusterRole`.
    pub kind: String,
    /// Role name.
    pub name: String,
}

/// `rbac.authorization.k8s.io/v1/RoleBinding`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleBinding {
    /// API group and version.
    pub api_version: String,
    /// Object kind.
    pub kind: String,
    /// Object metadata.
    pub metadata: ObjectMeta,
    /// Who the role is granted to.
    pub subjects: Vec<Subject>,
    /// The granted role.
    pub role_ref: RoleRef,
}

impl RoleBinding {
    /// Bind a namespaced role to a service account of the same namespace.
    pub fn service_account(
        namespace: &str,
        name: impl Into<String>,
        role: &str,
        service_account: &str,
    ) -> Self {
        Self {
            api_version: "rbac.authorization.k8s.io/v1".to_string(),
            kind: "RoleBinding".to_string(),
            metadata: ObjectMeta::namespaced(namespace, name)
                .with_label(MANAGED_BY_LABEL, MANAGED_BY),
            subjects: vec![Subject {
                kind: "ServiceAccount".to_string(),
                name: service_account.to_string(),
                namespace: Some(namespace.to_string()),
            }],
            role_ref: RoleRef {
                api_group: "rbac.authorization.k8s.io".to_string(),
                kind: "Role".to_string(),
                name: role.to_string(),
            },
        }
    }
}

/// Storage request of a claim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VolumeResourceRequirements {
    /// Requested amounts, e.g. `storage: 1Gi`.
    pub requests: BTreeMap<String, String>,
}

/// Claim spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistentVolumeClaimSpec {
    /// Access modes, e.g. `ReadWriteOnce`.
    pub access_modes: Vec<String>,
    /// Requested storage.
    pub resources: VolumeResourceRequirements,
    /// Storage class; cluster default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,
}

/// `v1/PersistentVolumeClaim`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistentVolumeClaim {
    /// API group and version.
    pub api_version: String,
    /// Object kind.
    pub kind: String,
    /// Object metadata.
    pub metadata: ObjectMeta,
    /// Claim spec.
    pub spec: PersistentVolumeClaimSpec,
}

impl PersistentVolumeClaim {
    /// Claim requesting `storage` with the given access modes.
    pub fn new(
        metadata: ObjectMeta,
        access_modes: &[&str],
        storage: &str,
        storage_class_name: Option<String>,
    ) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "PersistentVolumeClaim".to_string(),
            metadata,
            spec: PersistentVolumeClaimSpec {
                access_modes: access_modes.iter().map(|m| m.to_string()).collect(),
                resources: VolumeResourceRequirements {
                    requests: BTreeMap::from([("storage".to_string(), storage.to_string())]),
                },
                storage_class_name,
            },
        }
    }
}

/// Selects a field of the pod.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectFieldSelector {
    /// Path of the pod field, e.g. `metadata.name`.
    pub field_path: String,
}

/// Source of a variable value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvVarSource {
    /// Pod field to read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_ref: Option<ObjectFieldSelector>,
}

/// Container environment variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvVar {
    /// Variable name.
    pub name: String,
    /// Literal value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Value resolved at pod start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_from: Option<EnvVarSource>,
}

impl EnvVar {
    /// Variable resolved from a field of the pod (downward API).
    pub fn from_field(name: impl Into<String>, field_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            value_from: Some(EnvVarSource {
                field_ref: Some(ObjectFieldSelector {
                    field_path: field_path.into(),
                }),
            }),
        }
    }
}

/// Secret exposed as environment variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecretEnvSource {
    /// Secret name.
    pub name: String,
    /// Whether the pod starts without the secret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

/// Bulk environment source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvFromSource {
    /// Secret whose keys become variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretEnvSource>,
}

/// Volume mounted into a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VolumeMount {
    /// Name of the pod volume.
    pub name: String,
    /// Path inside the container.
    pub mount_path: String,
    /// Mount read-only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
}

/// Pod volume backed by a claim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistentVolumeClaimVolumeSource {
    /// Name of the claim.
    pub claim_name: String,
    /// Attach read-only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
}

/// Pod volume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Volume {
    /// Volume name, referenced by mounts.
    pub name: String,
    /// Claim backing the volume.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent_volume_claim: Option<PersistentVolumeClaimVolumeSource>,
}

impl Volume {
    /// Pod volume backed by the claim of the same name.
    pub fn claim(name: &str, read_only: bool) -> Self {
        Self {
            name: name.to_string(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: name.to_string(),
                read_only: read_only.then_some(true),
            }),
        }
    }
}

/// Container of a pod.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Container {
    /// Container name.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// `Always`, `IfNotPresent` or `Never`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,
    /// Entrypoint override.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    /// Arguments to the entrypoint.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Environment variables.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    /// Sources of bulk environment variables.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env_from: Vec<EnvFromSource>,
    /// Mounted volumes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
}

/// Pod spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PodSpec {
    /// Containers of the pod.
    pub containers: Vec<Container>,
    /// `Always`, `OnFailure` or `Never`.
    pub restart_policy: String,
    /// Service account the pod runs as.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
    /// Volumes available to the containers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
}

/// Template of the pods a job creates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PodTemplateSpec {
    /// Metadata of created pods.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ObjectMeta>,
    /// Spec of created pods.
    pub spec: PodSpec,
}

/// Job spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobSpec {
    /// Pod template.
    pub template: PodTemplateSpec,
    /// Retries before the job is marked failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_limit: Option<i32>,
}

/// One condition report of a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobCondition {
    /// Condition type, e.g. `Complete` or `Failed`.
    #[serde(rename = "type")]
    pub condition_type: String,
    /// "True", "False" or "Unknown".
    pub status: String,
    /// Machine-readable reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Human-readable detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JobCondition {
    pub fn new(condition_type: impl Into<String>, status: bool) -> Self {
        Self {
            condition_type: condition_type.into(),
            status: if status { "True" } else { "False" }.to_string(),
            reason: None,
            message: None,
        }
    }

    /// Whether the condition currently holds.
    pub fn is_true(&self) -> bool {
        self.status.eq_ignore_ascii_case("true")
    }
}

/// Observed state of a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobStatus {
    /// Condition reports; absent while the job runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<JobCondition>>,
    /// Pods currently running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<i32>,
    /// Pods that succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub succeeded: Option<i32>,
    /// Pods that failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<i32>,
    /// When the job started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// When the job completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<String>,
}

/// `batch/v1/Job`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Job {
    /// API group and version.
    pub api_version: String,
    /// Object kind.
    pub kind: String,
    /// Object metadata.
    pub metadata: ObjectMeta,
    /// Job spec.
    pub spec: JobSpec,
    /// Observed status, set by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
}

impl Job {
    /// `batch/v1` job.
    pub fn new(metadata: ObjectMeta, spec: JobSpec) -> Self {
        Self {
            api_version: "batch/v1".to_string(),
            kind: "Job".to_string(),
            metadata,
            spec,
            status: None,
        }
    }

    /// The first container of the pod template.
    pub fn container(&self) -> Option<&Container> {
        self.spec.template.spec.containers.first()
    }
}
