// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tests for the process registry (memory and SQLite implementations).

mod common;

use ades_core::registry::{
    JobRecord, MemoryRegistry, ProcessRegistry, RegistryError, SqliteRegistry,
};
use ades_core::{ExecutionHandle, ExecutionState};
use chrono::{Duration, Utc};
use common::sample_process;
use serde_json::json;
use tempfile::TempDir;

fn sample_job(process_id: &str, job_id: &str, offset_secs: i64) -> JobRecord {
    JobRecord::accepted(ExecutionHandle {
        execution_id: job_id.to_string(),
        process_id: process_id.to_string(),
        backend: "k8s".to_string(),
        locator: json!({"namespace": "soamc", "job_name": format!("job-{}", job_id)}),
        created_at: Utc::now() + Duration::seconds(offset_secs),
        backend_response: json!({"kind": "Job"}),
    })
}

async fn check_process_lifecycle(registry: &dyn ProcessRegistry) {
    registry.deploy_process(&sample_process("b")).await.unwrap();
    registry.deploy_process(&sample_process("a")).await.unwrap();

    let listed = registry.list_processes().await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"], "registration order is preserved");
    assert_eq!(listed[0], sample_process("b"), "descriptor round-trips");

    let duplicate = registry.deploy_process(&sample_process("a")).await;
    assert!(matches!(
        duplicate,
        Err(RegistryError::ProcessAlreadyExists(id)) if id == "a"
    ));

    let removed = registry.undeploy_process("b").await.unwrap();
    assert_eq!(removed.id, "b");
    assert!(registry.get_process("b").await.unwrap().is_none());
    assert!(registry.get_process("a").await.unwrap().is_some());

    assert!(matches!(
        registry.undeploy_process("b").await,
        Err(RegistryError::ProcessNotFound(_))
    ));
}

async fn check_job_lifecycle(registry: &dyn ProcessRegistry) {
    registry.insert_job(&sample_job("p1", "job2", 5)).await.unwrap();
    registry.insert_job(&sample_job("p1", "job1", 0)).await.unwrap();
    registry.insert_job(&sample_job("p2", "job3", 0)).await.unwrap();

    let job = registry.get_job("p1", "job1").await.unwrap().unwrap();
    assert_eq!(job.status, ExecutionState::Accepted);
    assert_eq!(job.handle.locator["job_name"], "job-job1");

    assert!(
        registry.get_job("p2", "job1").await.unwrap().is_none(),
        "jobs are scoped to their process"
    );

    registry
        .update_job_status("p1", "job1", ExecutionState::Running)
        .await
        .unwrap();
    let job = registry.get_job("p1", "job1").await.unwrap().unwrap();
    assert_eq!(job.status, ExecutionState::Running);

    let missing = registry
        .update_job_status("p1", "nope", ExecutionState::Running)
        .await;
    assert!(matches!(missing, Err(RegistryError::JobNotFound { .. })));

    let jobs = registry.list_jobs("p1").await.unwrap();
    assert_eq!(jobs.len(), 2);
}

#[tokio::test]
async fn test_memory_registry_processes() {
    check_process_lifecycle(&MemoryRegistry::new()).await;
}

#[tokio::test]
async fn test_memory_registry_jobs() {
    check_job_lifecycle(&MemoryRegistry::new()).await;
}

#[tokio::test]
async fn test_sqlite_registry_processes() {
    let registry = SqliteRegistry::in_memory().await.unwrap();
    check_process_lifecycle(&registry).await;
}

#[tokio::test]
async fn test_sqlite_registry_jobs() {
    let registry = SqliteRegistry::in_memory().await.unwrap();
    check_job_lifecycle(&registry).await;

    let jobs = registry.list_jobs("p1").await.unwrap();
    assert_eq!(jobs[0].job_id, "job1", "jobs are ordered by submission time");
}

#[tokio::test]
async fn test_sqlite_registry_persists_across_connections() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("ades.db");

    {
        let registry = SqliteRegistry::from_path(&path).await.unwrap();
        registry.deploy_process(&sample_process("p1")).await.unwrap();
        registry.pool().close().await;
    }

    let registry = SqliteRegistry::from_path(&path).await.unwrap();
    let process = registry.get_process("p1").await.unwrap().unwrap();
    assert_eq!(process.keywords, vec!["cwl", "demo, with comma"]);
}

#[tokio::test]
async fn test_sqlite_registry_connect_creates_database_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data").join("ades.db");

    let registry = SqliteRegistry::connect(&format!("sqlite:{}", path.display()))
        .await
        .unwrap();
    registry.deploy_process(&sample_process("p1")).await.unwrap();

    assert!(path.exists());
}
