// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock control plane for testing.
//!
//! Keeps created objects in memory and answers like an API server would:
//! duplicates are rejected with "already exists", missing objects with
//! "not found".

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use super::traits::*;
use crate::resources::{
    Job, JobStatus, Namespace, PersistentVolumeClaim, Role, RoleBinding, Secret,
};

type ObjectKey = (ResourceKind, String, String);

/// In-memory control plane.
#[derive(Clone, Default)]
pub struct MockControlPlane {
    objects: Arc<Mutex<BTreeMap<ObjectKey, Value>>>,
    failures: Arc<Mutex<HashMap<ResourceKind, (u16, String)>>>,
    calls: Arc<Mutex<Vec<String>>>,
    next_uid: Arc<AtomicU64>,
}

impl MockControlPlane {
    /// Create an empty control plane.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call on `kind` fail with an API error.
    pub async fn fail_kind(&self, kind: ResourceKind, status: u16, message: &str) {
        self.failures
            .lock()
            .await
            .insert(kind, (status, message.to_string()));
    }

    /// Remove an injected failure.
    pub async fn clear_failure(&self, kind: ResourceKind) {
        self.failures.lock().await.remove(&kind);
    }

    /// Pre-create an object so that creating it again collides.
    pub async fn seed(&self, kind: ResourceKind, namespace: &str, name: &str) {
        self.objects.lock().await.insert(
            (kind, namespace.to_string(), name.to_string()),
            serde_json::json!({ "metadata": { "name": name } }),
        );
    }

    /// Replace the status of a stored job.
    pub async fn set_job_status(&self, namespace: &str, name: &str, status: JobStatus) -> bool {
        let mut objects = self.objects.lock().await;
        match objects.get_mut(&(ResourceKind::Job, namespace.to_string(), name.to_string())) {
            Some(Value::Object(job)) => {
                job.insert(
                    "status".to_string(),
                    serde_json::to_value(status).unwrap_or(Value::Null),
                );
                true
            }
            _ => false,
        }
    }

    /// Whether an object exists.
    pub async fn contains(&self, kind: ResourceKind, namespace: &str, name: &str) -> bool {
        self.objects
            .lock()
            .await
            .contains_key(&(kind, namespace.to_string(), name.to_string()))
    }

    /// Fetch a stored object as a typed model.
    pub async fn get<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Option<T> {
        self.objects
            .lock()
            .await
            .get(&(kind, namespace.to_string(), name.to_string()))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Names of stored objects of one kind, sorted.
    pub async fn names(&self, kind: ResourceKind) -> Vec<String> {
        self.objects
            .lock()
            .await
            .keys()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, _, name)| name.clone())
            .collect()
    }

    /// Number of stored objects of one kind.
    pub async fn count(&self, kind: ResourceKind) -> usize {
        self.names(kind).await.len()
    }

    /// Calls made so far, as `"{operation} {kind} {name}"`.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    async fn check_failure(&self, kind: ResourceKind) -> Result<()> {
        match self.failures.lock().await.get(&kind) {
            Some((status, message)) => Err(ControlPlaneError::Api {
                status: *status,
                reason: "Injected".to_string(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn record(&self, operation: &str, kind: ResourceKind, name: &str) {
        self.calls
            .lock()
            .await
            .push(format!("{} {} {}", operation, kind, name));
    }

    async fn create<T: Serialize + Sync>(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        object: &T,
    ) -> Result<Value> {
        self.record("create", kind, name).await;
        self.check_failure(kind).await?;

        let key = (kind, namespace.to_string(), name.to_string());
        let mut objects = self.objects.lock().await;
        if objects.contains_key(&key) {
            return Err(ControlPlaneError::AlreadyExists {
                kind,
                name: name.to_string(),
            });
        }

        let mut value = serde_json::to_value(object)?;
        if let Some(metadata) = value.get_mut("metadata").and_then(Value::as_object_mut) {
            let uid = self.next_uid.fetch_add(1, Ordering::SeqCst) + 1;
            metadata.insert("uid".to_string(), Value::String(format!("uid-{:06}", uid)));
        }
        objects.insert(key, value.clone());
        Ok(value)
    }

    async fn delete(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<()> {
        self.record("delete", kind, name).await;
        self.check_failure(kind).await?;

        let key = (kind, namespace.to_string(), name.to_string());
        match self.objects.lock().await.remove(&key) {
            Some(_) => Ok(()),
            None => Err(ControlPlaneError::NotFound {
                kind,
                name: name.to_string(),
            }),
        }
    }
}

#[async_trait]
impl ControlPlane for MockControlPlane {
    async fn create_namespace(&self, namespace: &Namespace) -> Result<Value> {
        self.create(ResourceKind::Namespace, "", &namespace.metadata.name, namespace)
            .await
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Value> {
        self.create(ResourceKind::Secret, namespace, &secret.metadata.name, secret)
            .await
    }

    async fn create_role(&self, namespace: &str, role: &Role) -> Result<Value> {
        self.create(ResourceKind::Role, namespace, &role.metadata.name, role)
            .await
    }

    async fn create_role_binding(&self, namespace: &str, binding: &RoleBinding) -> Result<Value> {
        self.create(
            ResourceKind::RoleBinding,
            namespace,
            &binding.metadata.name,
            binding,
        )
        .await
    }

    async fn create_persistent_volume_claim(
        &self,
        namespace: &str,
        claim: &PersistentVolumeClaim,
    ) -> Result<Value> {
        self.create(
            ResourceKind::PersistentVolumeClaim,
            namespace,
            &claim.metadata.name,
            claim,
        )
        .await
    }

    async fn delete_persistent_volume_claim(&self, namespace: &str, name: &str) -> Result<()> {
        self.delete(ResourceKind::PersistentVolumeClaim, namespace, name)
            .await
    }

    async fn create_job(&self, namespace: &str, job: &Job) -> Result<Value> {
        self.create(ResourceKind::Job, namespace, &job.metadata.name, job)
            .await
    }

    async fn read_job(&self, namespace: &str, name: &str) -> Result<Job> {
        self.record("read", ResourceKind::Job, name).await;
        self.check_failure(ResourceKind::Job).await?;

        let objects = self.objects.lock().await;
        let value = objects
            .get(&(ResourceKind::Job, namespace.to_string(), name.to_string()))
            .ok_or_else(|| ControlPlaneError::NotFound {
                kind: ResourceKind::Job,
                name: name.to_string(),
            })?;
        Ok(serde_json::from_value(value.clone())?)
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<()> {
        self.delete(ResourceKind::Job, namespace, name).await
    }
}
