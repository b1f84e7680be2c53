// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! ADES Environment - cluster and registry bootstrap
//!
//! Prepares everything the WPS-T front end needs before it serves requests:
//! - the working namespace, runner roles and object-store secret
//! - the process registry database and its schema

use std::sync::Arc;
use tracing::{info, warn};

use ades_core::WpsService;
use ades_core::registry::SqliteRegistry;
use ades_environment::config::Config;
use ades_environment::control_plane::KubeClient;
use ades_environment::provisioning::{ObjectStoreCredentials, Provisioner};
use ades_environment::K8sBackend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ades_environment=info,ades_core=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let config = Config::from_env()?;

    info!(
        api_url = %config.kube.api_url,
        namespace = %config.namespace,
        runner_image = %config.runner.image,
        "Starting ADES environment bootstrap"
    );

    let control_plane = Arc::new(KubeClient::new(&config.kube)?);

    let credentials = ObjectStoreCredentials::from_env();
    if credentials.is_none() {
        info!("AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY not set, no object-store secret");
    }

    let provisioner = Provisioner::new(
        control_plane.clone(),
        &config.namespace,
        &config.service_account,
    );
    provisioner.provision(credentials.as_ref()).await?;

    info!("Cluster provisioned");

    let registry = Arc::new(SqliteRegistry::connect(&config.database_url).await?);

    info!("Registry schema verified");

    let backend = Arc::new(K8sBackend::new(control_plane, &config));
    let service = WpsService::new(registry, backend);
    let processes = service.get_processes().await?;

    info!(
        processes = processes.len(),
        namespace = %config.namespace,
        "ADES environment ready"
    );

    Ok(())
}
