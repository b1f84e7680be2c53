// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared-object provisioning tests.

mod common;

use std::sync::Arc;

use ades_core::backend::BackendError;
use ades_environment::control_plane::{MockControlPlane, ResourceKind};
use ades_environment::provisioning::{
    LOG_READER_ROLE, OBJECT_STORE_SECRET, POD_MANAGER_ROLE, Provisioned,
};
use ades_environment::resources::{Role, RoleBinding, Secret};
use ades_environment::{ObjectStoreCredentials, Provisioner};
use common::NAMESPACE;

fn provisioner(cp: &MockControlPlane) -> Provisioner {
    Provisioner::new(Arc::new(cp.clone()), NAMESPACE, "default")
}

#[tokio::test]
async fn test_provision_creates_shared_objects() {
    let cp = MockControlPlane::new();
    let creds = ObjectStoreCredentials::new("AKIA", "secret");

    provisioner(&cp).provision(Some(&creds)).await.unwrap();

    assert!(cp.contains(ResourceKind::Namespace, "", NAMESPACE).await);
    assert_eq!(
        cp.names(ResourceKind::Role).await,
        vec![LOG_READER_ROLE, POD_MANAGER_ROLE]
    );
    assert_eq!(cp.count(ResourceKind::RoleBinding).await, 2);

    let pod_manager: Role = cp
        .get(ResourceKind::Role, NAMESPACE, POD_MANAGER_ROLE)
        .await
        .unwrap();
    assert_eq!(pod_manager.rules[0].resources, vec!["pods"]);
    assert_eq!(
        pod_manager.rules[0].verbs,
        vec!["create", "patch", "delete", "list", "watch"]
    );

    let log_reader: Role = cp
        .get(ResourceKind::Role, NAMESPACE, LOG_READER_ROLE)
        .await
        .unwrap();
    assert_eq!(log_reader.rules[0].resources, vec!["pods/log"]);
    assert_eq!(log_reader.rules[0].verbs, vec!["get", "list"]);

    let binding: RoleBinding = cp
        .get(ResourceKind::RoleBinding, NAMESPACE, "log-reader-default-binding")
        .await
        .unwrap();
    assert_eq!(binding.role_ref.name, LOG_READER_ROLE);
    assert_eq!(binding.subjects[0].kind, "ServiceAccount");
    assert_eq!(binding.subjects[0].name, "default");

    let secret: Secret = cp
        .get(ResourceKind::Secret, NAMESPACE, OBJECT_STORE_SECRET)
        .await
        .unwrap();
    assert_eq!(secret.secret_type, "Opaque");
    assert_eq!(secret.immutable, Some(true));
    assert_eq!(secret.data["aws_access_key_id"], "QUtJQQ==");
}

#[tokio::test]
async fn test_provision_twice_is_idempotent() {
    let cp = MockControlPlane::new();
    let creds = ObjectStoreCredentials::new("AKIA", "secret");
    let p = provisioner(&cp);

    p.provision(Some(&creds)).await.unwrap();
    p.provision(Some(&creds)).await.unwrap();

    assert_eq!(cp.count(ResourceKind::Namespace).await, 1);
    assert_eq!(cp.count(ResourceKind::Role).await, 2);
    assert_eq!(cp.count(ResourceKind::RoleBinding).await, 2);
    assert_eq!(cp.count(ResourceKind::Secret).await, 1);

    assert_eq!(
        p.ensure_namespace().await.unwrap(),
        Provisioned::AlreadyExisted
    );
    assert_eq!(
        p.ensure_object_store_secret(Some(&creds)).await.unwrap(),
        Some(Provisioned::AlreadyExisted)
    );
}

#[tokio::test]
async fn test_missing_credentials_skip_secret() {
    let cp = MockControlPlane::new();

    let outcome = provisioner(&cp)
        .ensure_object_store_secret(None)
        .await
        .unwrap();

    assert_eq!(outcome, None);
    assert_eq!(cp.count(ResourceKind::Secret).await, 0);
}

#[tokio::test]
async fn test_other_failures_are_fatal() {
    let cp = MockControlPlane::new();
    cp.fail_kind(ResourceKind::RoleBinding, 403, "rolebindings is forbidden")
        .await;

    let err = provisioner(&cp)
        .ensure_access_bindings()
        .await
        .unwrap_err();

    match err {
        BackendError::ControlPlane {
            operation, message, ..
        } => {
            assert_eq!(operation, "create_role_binding");
            assert!(message.contains("forbidden"));
        }
        other => panic!("expected ControlPlane, got {:?}", other),
    }
}
