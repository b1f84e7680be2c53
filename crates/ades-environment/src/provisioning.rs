// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared cluster setup.
//!
//! The namespace, the access roles the runner needs and the object-store
//! secret are shared by every execution. All steps are idempotent: an object
//! that already exists counts as success, anything else is fatal.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ades_core::backend::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info};

use crate::control_plane::{ControlPlane, ControlPlaneError};
use crate::resources::{Namespace, PolicyRule, Role, RoleBinding, Secret};

/// Role allowing the runner to manage its step pods.
pub const POD_MANAGER_ROLE: &str = "pod-manager-role";
/// Role allowing the runner to read step pod logs.
pub const LOG_READER_ROLE: &str = "log-reader-role";
/// Binding of [`POD_MANAGER_ROLE`].
pub const POD_MANAGER_BINDING: &str = "pod-manager-default-binding";
/// Binding of [`LOG_READER_ROLE`].
pub const LOG_READER_BINDING: &str = "log-reader-default-binding";
/// Secret holding object-store credentials.
pub const OBJECT_STORE_SECRET: &str = "aws-creds";

/// Outcome of an idempotent create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    Created,
    AlreadyExisted,
}

/// Cloud object-store credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct ObjectStoreCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for ObjectStoreCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStoreCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

impl ObjectStoreCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    /// Read `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`; `None` unless both are set.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_key_id = lookup("AWS_ACCESS_KEY_ID").filter(|v| !v.is_empty())?;
        let secret_access_key = lookup("AWS_SECRET_ACCESS_KEY").filter(|v| !v.is_empty())?;
        Some(Self::new(access_key_id, secret_access_key))
    }

    /// Secret data: each value base64-encoded, keyed by the name the runner
    /// sees as an environment variable.
    pub fn secret_data(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                "aws_access_key_id".to_string(),
                STANDARD.encode(&self.access_key_id),
            ),
            (
                "aws_secret_access_key".to_string(),
                STANDARD.encode(&self.secret_access_key),
            ),
        ])
    }
}

/// Creates the shared objects executions depend on.
pub struct Provisioner {
    control_plane: Arc<dyn ControlPlane>,
    namespace: String,
    service_account: String,
}

impl Provisioner {
    pub fn new(
        control_plane: Arc<dyn ControlPlane>,
        namespace: impl Into<String>,
        service_account: impl Into<String>,
    ) -> Self {
        Self {
            control_plane,
            namespace: namespace.into(),
            service_account: service_account.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Create the working namespace.
    pub async fn ensure_namespace(&self) -> Result<Provisioned> {
        let result = self
            .control_plane
            .create_namespace(&Namespace::new(&self.namespace))
            .await;
        let outcome = idempotent(result, "create_namespace")?;
        info!(namespace = %self.namespace, ?outcome, "Namespace ready");
        Ok(outcome)
    }

    /// Create the pod-manager and log-reader roles and bind both to the
    /// service account.
    pub async fn ensure_access_bindings(&self) -> Result<()> {
        let pod_manager = Role::new(
            &self.namespace,
            POD_MANAGER_ROLE,
            vec![PolicyRule::core(
                &["pods"],
                &["create", "patch", "delete", "list", "watch"],
            )],
        );
        let log_reader = Role::new(
            &self.namespace,
            LOG_READER_ROLE,
            vec![PolicyRule::core(&["pods/log"], &["get", "list"])],
        );

        for (role, binding_name) in [
            (pod_manager, POD_MANAGER_BINDING),
            (log_reader, LOG_READER_BINDING),
        ] {
            let result = self.control_plane.create_role(&self.namespace, &role).await;
            let outcome = idempotent(result, "create_role")?;
            debug!(role = %role.metadata.name, ?outcome, "Role ready");

            let binding = RoleBinding::service_account(
                &self.namespace,
                binding_name,
                &role.metadata.name,
                &self.service_account,
            );
            let result = self
                .control_plane
                .create_role_binding(&self.namespace, &binding)
                .await;
            let outcome = idempotent(result, "create_role_binding")?;
            debug!(binding = %binding_name, ?outcome, "Role binding ready");
        }

        info!(
            namespace = %self.namespace,
            service_account = %self.service_account,
            "Access bindings ready"
        );
        Ok(())
    }

    /// Store object-store credentials as an immutable secret.
    ///
    /// Returns `None` when no credentials are configured.
    pub async fn ensure_object_store_secret(
        &self,
        credentials: Option<&ObjectStoreCredentials>,
    ) -> Result<Option<Provisioned>> {
        let Some(credentials) = credentials else {
            debug!("No object-store credentials configured, skipping secret");
            return Ok(None);
        };

        let secret = Secret::immutable_opaque(
            &self.namespace,
            OBJECT_STORE_SECRET,
            credentials.secret_data(),
        );
        let result = self.control_plane.create_secret(&self.namespace, &secret).await;
        let outcome = idempotent(result, "create_secret")?;
        info!(secret = OBJECT_STORE_SECRET, ?outcome, "Object-store secret ready");
        Ok(Some(outcome))
    }

    /// Run all three steps in order.
    pub async fn provision(&self, credentials: Option<&ObjectStoreCredentials>) -> Result<()> {
        self.ensure_namespace().await?;
        self.ensure_access_bindings().await?;
        self.ensure_object_store_secret(credentials).await?;
        Ok(())
    }
}

fn idempotent<T>(
    result: std::result::Result<T, ControlPlaneError>,
    operation: &str,
) -> Result<Provisioned> {
    match result {
        Ok(_) => Ok(Provisioned::Created),
        Err(e) if e.is_already_exists() => Ok(Provisioned::AlreadyExisted),
        Err(e) => Err(e.into_backend(operation, "-")),
    }
}
