// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Kubernetes REST client.
//!
//! Talks to the API server directly over HTTPS with bearer-token auth.
//! Credentials and endpoint come from [`KubeConfig`].

use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use super::traits::*;
use crate::config::KubeConfig;
use crate::resources::{Job, Namespace, PersistentVolumeClaim, Role, RoleBinding, Secret};

/// `Status` object returned by the API server on failures.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ApiStatus {
    reason: String,
    message: String,
}

/// Control-plane client over the Kubernetes REST API.
pub struct KubeClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl KubeClient {
    /// Build a client from configuration.
    pub fn new(config: &KubeConfig) -> Result<Self> {
        let parsed = url::Url::parse(&config.api_url)
            .map_err(|e| ControlPlaneError::Config(format!("invalid API URL: {}", e)))?;

        let mut builder = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.skip_tls_verify);

        if let Some(ca_file) = &config.ca_file {
            let pem = std::fs::read(ca_file).map_err(|e| {
                ControlPlaneError::Config(format!("cannot read {}: {}", ca_file.display(), e))
            })?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }

        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            token: config.token.clone(),
            http: builder.build()?,
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let request = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn create<T: Serialize + Sync>(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        body: &T,
    ) -> Result<Value> {
        let path = kind.collection_path(namespace);
        debug!(%kind, %name, %path, "Creating object");
        let response = self.request(Method::POST, &path).json(body).send().await?;
        decode(kind, name, response).await
    }

    async fn delete(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<()> {
        let path = kind.object_path(namespace, name);
        debug!(%kind, %name, %path, "Deleting object");
        let response = self
            .request(Method::DELETE, &path)
            .json(&json!({
                "kind": "DeleteOptions",
                "apiVersion": "v1",
                "propagationPolicy": "Background"
            }))
            .send()
            .await?;
        decode::<Value>(kind, name, response).await.map(|_| ())
    }
}

async fn decode<T: DeserializeOwned>(kind: ResourceKind, name: &str, response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    match status {
        StatusCode::CONFLICT => Err(ControlPlaneError::AlreadyExists {
            kind,
            name: name.to_string(),
        }),
        StatusCode::NOT_FOUND => Err(ControlPlaneError::NotFound {
            kind,
            name: name.to_string(),
        }),
        _ => {
            let body = response.text().await.unwrap_or_default();
            let api_status: ApiStatus = serde_json::from_str(&body).unwrap_or_default();
            Err(ControlPlaneError::Api {
                status: status.as_u16(),
                reason: api_status.reason,
                message: if api_status.message.is_empty() {
                    body
                } else {
                    api_status.message
                },
            })
        }
    }
}

#[async_trait]
impl ControlPlane for KubeClient {
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
        let path = ResourceKind::Job.object_path(namespace, name);
        let response = self.request(Method::GET, &path).send().await?;
        decode(ResourceKind::Job, name, response).await
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<()> {
        self.delete(ResourceKind::Job, namespace, name).await
    }
}
