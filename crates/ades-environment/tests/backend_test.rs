// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! K8sBackend tests against the in-memory control plane.

mod common;

use std::sync::Arc;

use ades_core::backend::{BackendError, ExecutionBackend};
use ades_core::execution::ExecutionState;
use ades_core::registry::MemoryRegistry;
use ades_core::{ServiceError, WpsService};
use ades_environment::control_plane::ResourceKind;
use ades_environment::resources::{Job, JobCondition, JobStatus};
use common::*;

#[tokio::test]
async fn test_submit_scenario() {
    let ctx = BackendContext::new().with_ids(&["abcdef123456"]);

    let handle = ctx
        .backend
        .submit(&scenario_process(), &scenario_request())
        .await
        .unwrap();

    assert_eq!(handle.execution_id, "abcdef123456");
    assert_eq!(handle.process_id, "p1");
    assert_eq!(handle.backend, "k8s");
    assert_eq!(handle.locator["namespace"], NAMESPACE);
    assert_eq!(handle.locator["job_name"], "job-abcdef123456");
    assert_eq!(handle.backend_response["metadata"]["name"], "job-abcdef123456");

    assert_eq!(
        ctx.control_plane
            .names(ResourceKind::PersistentVolumeClaim)
            .await,
        vec![
            "input-data-abcdef123456",
            "output-data-abcdef123456",
            "tmpout-abcdef123456"
        ]
    );

    let job: Job = ctx
        .control_plane
        .get(ResourceKind::Job, NAMESPACE, "job-abcdef123456")
        .await
        .unwrap();
    let args = &job.container().unwrap().args;
    assert!(args.ends_with(&[
        "--infile".to_string(),
        "file.txt".to_string(),
        "--aws_access_key_id".to_string(),
        "$(aws_access_key_id)".to_string(),
        "https://x/app.cwl".to_string(),
    ]));
}

#[tokio::test]
async fn test_random_identifiers_are_cluster_legal() {
    let ctx = BackendContext::new();
    let handle = ctx
        .backend
        .submit(&scenario_process(), &scenario_request())
        .await
        .unwrap();

    let id = &handle.execution_id;
    assert_eq!(id.len(), 12);
    assert!(id.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
    assert_eq!(BackendContext::job_name(&handle), format!("job-{}", id));
}

#[tokio::test]
async fn test_collision_on_job_rerolls_identifier() {
    let ctx = BackendContext::new().with_ids(&["first0000000", "second000000"]);
    ctx.control_plane
        .seed(ResourceKind::Job, NAMESPACE, "job-first0000000")
        .await;

    let handle = ctx
        .backend
        .submit(&scenario_process(), &scenario_request())
        .await
        .unwrap();

    assert_eq!(handle.execution_id, "second000000");
    assert_eq!(handle.locator["job_name"], "job-second000000");
    assert_eq!(handle.locator["input_volume"], "input-data-second000000");
    assert_eq!(handle.locator["tmpout_volume"], "tmpout-second000000");
    assert_eq!(handle.locator["output_volume"], "output-data-second000000");

    // Volumes of the abandoned identifier are removed again.
    assert_eq!(
        ctx.control_plane
            .names(ResourceKind::PersistentVolumeClaim)
            .await,
        vec![
            "input-data-second000000",
            "output-data-second000000",
            "tmpout-second000000"
        ]
    );
    // The pre-existing job is left alone.
    assert!(
        ctx.control_plane
            .contains(ResourceKind::Job, NAMESPACE, "job-first0000000")
            .await
    );
}

#[tokio::test]
async fn test_collision_on_volume_rerolls_identifier() {
    let ctx = BackendContext::new().with_ids(&["first0000000", "second000000"]);
    ctx.control_plane
        .seed(
            ResourceKind::PersistentVolumeClaim,
            NAMESPACE,
            "tmpout-first0000000",
        )
        .await;

    let handle = ctx
        .backend
        .submit(&scenario_process(), &scenario_request())
        .await
        .unwrap();
    assert_eq!(handle.execution_id, "second000000");

    assert!(
        !ctx.control_plane
            .contains(
                ResourceKind::PersistentVolumeClaim,
                NAMESPACE,
                "input-data-first0000000"
            )
            .await
    );
    assert!(
        ctx.control_plane
            .contains(
                ResourceKind::PersistentVolumeClaim,
                NAMESPACE,
                "tmpout-first0000000"
            )
            .await
    );
}

#[tokio::test]
async fn test_collision_attempts_exhausted() {
    let config = test_config(&[("ADES_MAX_NAME_ATTEMPTS", "2")]);
    let ctx = BackendContext::with_config(config).with_ids(&["aaaaaaaaaaaa", "bbbbbbbbbbbb"]);
    for id in ["aaaaaaaaaaaa", "bbbbbbbbbbbb"] {
        ctx.control_plane
            .seed(
                ResourceKind::PersistentVolumeClaim,
                NAMESPACE,
                &format!("input-data-{}", id),
            )
            .await;
    }

    let err = ctx
        .backend
        .submit(&scenario_process(), &scenario_request())
        .await
        .unwrap_err();

    match err {
        BackendError::NameCollision { name, attempts } => {
            assert_eq!(name, "input-data-bbbbbbbbbbbb");
            assert_eq!(attempts, 2);
        }
        other => panic!("expected NameCollision, got {:?}", other),
    }
    assert_eq!(ctx.control_plane.count(ResourceKind::Job).await, 0);
}

#[tokio::test]
async fn test_fatal_failure_without_rollback_keeps_volumes() {
    let ctx = BackendContext::new().with_ids(&["abcabcabcabc"]);
    ctx.control_plane
        .fail_kind(ResourceKind::Job, 403, "jobs.batch is forbidden")
        .await;

    let err = ctx
        .backend
        .submit(&scenario_process(), &scenario_request())
        .await
        .unwrap_err();

    match err {
        BackendError::ControlPlane {
            operation,
            execution_id,
            message,
        } => {
            assert_eq!(operation, "create_job");
            assert_eq!(execution_id, "abcabcabcabc");
            assert!(message.contains("forbidden"));
        }
        other => panic!("expected ControlPlane, got {:?}", other),
    }
    assert_eq!(
        ctx.control_plane
            .count(ResourceKind::PersistentVolumeClaim)
            .await,
        3
    );
}

#[tokio::test]
async fn test_fatal_failure_with_rollback_removes_volumes() {
    let config = test_config(&[("ADES_ROLLBACK_ON_FAILURE", "true")]);
    let ctx = BackendContext::with_config(config).with_ids(&["abcabcabcabc"]);
    ctx.control_plane
        .fail_kind(ResourceKind::Job, 500, "etcdserver: request timed out")
        .await;

    let err = ctx
        .backend
        .submit(&scenario_process(), &scenario_request())
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::ControlPlane { .. }));
    assert_eq!(
        ctx.control_plane
            .count(ResourceKind::PersistentVolumeClaim)
            .await,
        0
    );
}

#[tokio::test]
async fn test_volume_failure_is_fatal() {
    let ctx = BackendContext::new();
    ctx.control_plane
        .fail_kind(ResourceKind::PersistentVolumeClaim, 401, "Unauthorized")
        .await;

    let err = ctx
        .backend
        .submit(&scenario_process(), &scenario_request())
        .await
        .unwrap_err();

    match err {
        BackendError::ControlPlane { operation, .. } => {
            assert_eq!(operation, "create_persistent_volume_claim")
        }
        other => panic!("expected ControlPlane, got {:?}", other),
    }
    assert_eq!(ctx.control_plane.count(ResourceKind::Job).await, 0);
}

#[tokio::test]
async fn test_state_follows_job_status() {
    let ctx = BackendContext::new();
    let handle = ctx
        .backend
        .submit(&scenario_process(), &scenario_request())
        .await
        .unwrap();

    assert_eq!(
        ctx.backend.state(&handle).await.unwrap(),
        ExecutionState::Accepted
    );

    ctx.set_status(
        &handle,
        JobStatus {
            active: Some(1),
            ..Default::default()
        },
    )
    .await;
    assert_eq!(
        ctx.backend.state(&handle).await.unwrap(),
        ExecutionState::Running
    );

    ctx.set_status(
        &handle,
        JobStatus {
            conditions: Some(vec![JobCondition::new("Failed", true)]),
            failed: Some(1),
            ..Default::default()
        },
    )
    .await;
    assert_eq!(
        ctx.backend.state(&handle).await.unwrap(),
        ExecutionState::Failed
    );

    ctx.complete(&handle).await;
    assert_eq!(
        ctx.backend.state(&handle).await.unwrap(),
        ExecutionState::Successful
    );
}

#[tokio::test]
async fn test_unrecognized_condition() {
    let ctx = BackendContext::new();
    let handle = ctx
        .backend
        .submit(&scenario_process(), &scenario_request())
        .await
        .unwrap();
    ctx.set_status(
        &handle,
        JobStatus {
            conditions: Some(vec![JobCondition::new("Suspended", true)]),
            ..Default::default()
        },
    )
    .await;

    let err = ctx.backend.state(&handle).await.unwrap_err();
    assert!(matches!(err, BackendError::UnrecognizedStatus { .. }));
}

#[tokio::test]
async fn test_results_require_success() {
    let ctx = BackendContext::new();
    let handle = ctx
        .backend
        .submit(&scenario_process(), &scenario_request())
        .await
        .unwrap();

    let err = ctx.backend.results(&handle).await.unwrap_err();
    assert!(matches!(
        err,
        BackendError::ResultsUnavailable {
            state: ExecutionState::Accepted,
            ..
        }
    ));

    ctx.complete(&handle).await;
    let results = ctx.backend.results(&handle).await.unwrap();
    let output = format!("output-data-{}", handle.execution_id);

    assert_eq!(results.links.len(), 3);
    assert_eq!(
        results.links[0].href,
        format!("pvc://soamc/{}/docker-output.json", output)
    );
    assert_eq!(results.links[0].rel, "result");
    assert_eq!(results.links[0].media_type, "application/json");
    assert_eq!(results.links[1].rel, "usage");
    assert_eq!(results.links[2].rel, "log");
    assert_eq!(results.links[2].media_type, "text/plain");
}

#[tokio::test]
async fn test_dismiss_keeps_volumes_by_default() {
    let ctx = BackendContext::new();
    let handle = ctx
        .backend
        .submit(&scenario_process(), &scenario_request())
        .await
        .unwrap();

    let state = ctx.backend.dismiss(&handle).await.unwrap();
    assert_eq!(state, ExecutionState::Dismissed);
    assert_eq!(ctx.control_plane.count(ResourceKind::Job).await, 0);
    assert_eq!(
        ctx.control_plane
            .count(ResourceKind::PersistentVolumeClaim)
            .await,
        3
    );

    // Dismissing again is harmless.
    assert_eq!(
        ctx.backend.dismiss(&handle).await.unwrap(),
        ExecutionState::Dismissed
    );

    let err = ctx.backend.state(&handle).await.unwrap_err();
    assert!(matches!(err, BackendError::ExecutionNotFound(_)));
}

#[tokio::test]
async fn test_dismiss_can_delete_volumes() {
    let config = test_config(&[("ADES_DELETE_VOLUMES_ON_DISMISS", "1")]);
    let ctx = BackendContext::with_config(config);
    let handle = ctx
        .backend
        .submit(&scenario_process(), &scenario_request())
        .await
        .unwrap();

    ctx.backend.dismiss(&handle).await.unwrap();
    assert_eq!(
        ctx.control_plane
            .count(ResourceKind::PersistentVolumeClaim)
            .await,
        0
    );
}

#[tokio::test]
async fn test_foreign_handle_is_rejected() {
    let ctx = BackendContext::new();
    let mut handle = ctx
        .backend
        .submit(&scenario_process(), &scenario_request())
        .await
        .unwrap();
    handle.backend = "mock".to_string();

    let err = ctx.backend.state(&handle).await.unwrap_err();
    assert!(matches!(err, BackendError::InvalidHandle(_)));
}

#[tokio::test]
async fn test_deploy_validates_workflow_url() {
    let ctx = BackendContext::new();

    let process = scenario_process();
    assert_eq!(ctx.backend.deploy(&process).await.unwrap(), process);
    assert_eq!(ctx.backend.undeploy(&process).await.unwrap(), process);

    let mut bad = scenario_process();
    bad.ows_context_url = "not a url".to_string();
    let err = ctx.backend.deploy(&bad).await.unwrap_err();
    assert!(matches!(err, BackendError::InvalidProcess { .. }));
}

#[tokio::test]
async fn test_service_over_k8s_backend() {
    let ctx = BackendContext::new();
    let control_plane = ctx.control_plane.clone();
    let service = WpsService::new(Arc::new(MemoryRegistry::new()), Arc::new(ctx.backend));

    service.deploy_process(scenario_process()).await.unwrap();
    let job = service.execute("p1", scenario_request()).await.unwrap();
    assert_eq!(job.status, ExecutionState::Accepted);

    let err = service.get_job_results("p1", &job.job_id).await.unwrap_err();
    assert!(matches!(err, ServiceError::ResultsUnavailable { .. }));

    control_plane
        .set_job_status(
            NAMESPACE,
            &format!("job-{}", job.job_id),
            JobStatus {
                conditions: Some(vec![JobCondition::new("Complete", true)]),
                ..Default::default()
            },
        )
        .await;

    let job = service.get_job("p1", &job.job_id).await.unwrap();
    assert_eq!(job.status, ExecutionState::Successful);

    let results = service.get_job_results("p1", &job.job_id).await.unwrap();
    assert_eq!(results.links.len(), 3);
}

#[tokio::test]
async fn test_service_refuses_to_dismiss_completed_job() {
    let ctx = BackendContext::new();
    let control_plane = ctx.control_plane.clone();
    let service = WpsService::new(Arc::new(MemoryRegistry::new()), Arc::new(ctx.backend));

    service.deploy_process(scenario_process()).await.unwrap();
    let job = service.execute("p1", scenario_request()).await.unwrap();
    let job_name = format!("job-{}", job.job_id);

    // Completes on the cluster without being polled.
    control_plane
        .set_job_status(
            NAMESPACE,
            &job_name,
            JobStatus {
                conditions: Some(vec![JobCondition::new("Complete", true)]),
                succeeded: Some(1),
                ..Default::default()
            },
        )
        .await;

    let err = service.dismiss_job("p1", &job.job_id).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::JobAlreadyTerminal {
            state: ExecutionState::Successful,
            ..
        }
    ));
    assert!(
        control_plane
            .contains(ResourceKind::Job, NAMESPACE, &job_name)
            .await
    );
    assert_eq!(
        service.get_job("p1", &job.job_id).await.unwrap().status,
        ExecutionState::Successful
    );
    assert!(service.get_job_results("p1", &job.job_id).await.is_ok());
}

#[tokio::test]
async fn test_service_keeps_running_when_pod_is_between_attempts() {
    let ctx = BackendContext::new();
    let control_plane = ctx.control_plane.clone();
    let service = WpsService::new(Arc::new(MemoryRegistry::new()), Arc::new(ctx.backend));

    service.deploy_process(scenario_process()).await.unwrap();
    let job = service.execute("p1", scenario_request()).await.unwrap();
    let job_name = format!("job-{}", job.job_id);

    control_plane
        .set_job_status(
            NAMESPACE,
            &job_name,
            JobStatus {
                active: Some(1),
                ..Default::default()
            },
        )
        .await;
    assert_eq!(
        service.get_job("p1", &job.job_id).await.unwrap().status,
        ExecutionState::Running
    );

    control_plane
        .set_job_status(
            NAMESPACE,
            &job_name,
            JobStatus {
                active: Some(0),
                ..Default::default()
            },
        )
        .await;
    assert_eq!(
        service.get_job("p1", &job.job_id).await.unwrap().status,
        ExecutionState::Running
    );
    assert_eq!(
        service.get_jobs("p1").await.unwrap()[0].status,
        ExecutionState::Running
    );
}

#[tokio::test]
async fn test_service_dismisses_running_job() {
    let ctx = BackendContext::new();
    let control_plane = ctx.control_plane.clone();
    let service = WpsService::new(Arc::new(MemoryRegistry::new()), Arc::new(ctx.backend));

    service.deploy_process(scenario_process()).await.unwrap();
    let job = service.execute("p1", scenario_request()).await.unwrap();

    let dismissed = service.dismiss_job("p1", &job.job_id).await.unwrap();
    assert_eq!(dismissed.status, ExecutionState::Dismissed);
    assert_eq!(control_plane.count(ResourceKind::Job).await, 0);
    assert_eq!(
        service.get_job("p1", &job.job_id).await.unwrap().status,
        ExecutionState::Dismissed
    );
}
