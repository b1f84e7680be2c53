// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Control-plane trait definitions.
//!
//! Defines the subset of the cluster API the execution backend needs.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::resources::{Job, Namespace, PersistentVolumeClaim, Role, RoleBinding, Secret};

/// Kinds of objects the backend manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Namespace,
    Secret,
    Role,
    RoleBinding,
    PersistentVolumeClaim,
    Job,
}

impl ResourceKind {
    /// REST collection path of this kind, scoped to `namespace` when namespaced.
    pub fn collection_path(&self, namespace: &str) -> String {
        match self {
            Self::Namespace => "/api/v1/namespaces".to_string(),
            Self::Secret => format!("/api/v1/namespaces/{}/secrets", namespace),
            Self::PersistentVolumeClaim => {
                format!("/api/v1/namespaces/{}/persistentvolumeclaims", namespace)
            }
            Self::Role => format!(
                "/apis/rbac.authorization.k8s.io/v1/namespaces/{}/roles",
                namespace
            ),
            Self::RoleBinding => format!(
                "/apis/rbac.authorization.k8s.io/v1/namespaces/{}/rolebindings",
                namespace
            ),
            Self::Job => format!("/apis/batch/v1/namespaces/{}/jobs", namespace),
        }
    }

    /// REST path of a single object.
    pub fn object_path(&self, namespace: &str, name: &str) -> String {
        format!("{}/{}", self.collection_path(namespace), name)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Namespace => "namespace",
            Self::Secret => "secret",
            Self::Role => "role",
            Self::RoleBinding => "rolebinding",
            Self::PersistentVolumeClaim => "persistentvolumeclaim",
            Self::Job => "job",
        };
        f.write_str(name)
    }
}

/// Errors from control-plane calls.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ControlPlaneError {
    /// An object with the same name already exists (HTTP 409).
    #[error("{kind} '{name}' already exists")]
    AlreadyExists {
        /// Object kind.
        kind: ResourceKind,
        /// Object name.
        name: String,
    },

    /// The object does not exist (HTTP 404).
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Object kind.
        kind: ResourceKind,
        /// Object name.
        name: String,
    },

    /// The API server rejected the call.
    #[error("API error {status} ({reason}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Machine-readable reason from the `Status` object.
        reason: String,
        /// Human-readable message from the `Status` object.
        message: String,
    },

    /// Transport failure (connection refused, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Client configuration is unusable.
    #[error("Client configuration error: {0}")]
    Config(String),
}

impl ControlPlaneError {
    /// Whether this is a name collision.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Whether the object was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for control-plane calls.
pub type Result<T> = std::result::Result<T, ControlPlaneError>;

/// Cluster resource API used by provisioning, submission and reconciliation.
///
/// Create calls return the raw JSON the API server accepted.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Create a namespace.
    async fn create_namespace(&self, namespace: &Namespace) -> Result<Value>;

    /// Create a secret in `namespace`.
    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Value>;

    /// Create a role in `namespace`.
    async fn create_role(&self, namespace: &str, role: &Role) -> Result<Value>;

    /// Create a role binding in `namespace`.
    async fn create_role_binding(&self, namespace: &str, binding: &RoleBinding) -> Result<Value>;

    /// Create a persistent volume claim in `namespace`.
    async fn create_persistent_volume_claim(
        &self,
        namespace: &str,
        claim: &PersistentVolumeClaim,
    ) -> Result<Value>;

    /// Delete a persistent volume claim.
    async fn delete_persistent_volume_claim(&self, namespace: &str, name: &str) -> Result<()>;

    /// Create a batch job in `namespace`.
    async fn create_job(&self, namespace: &str, job: &Job) -> Result<Value>;

    /// Read a batch job including its status.
    async fn read_job(&self, namespace: &str, name: &str) -> Result<Job>;

    /// Delete a batch job and, in the background, its pods.
    async fn delete_job(&self, namespace: &str, name: &str) -> Result<()>;
}
