// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cluster control-plane access.
//!
//! - `http`: Kubernetes REST client (production)
//! - `mock`: in-memory implementation for tests

pub mod http;
pub mod mock;
mod traits;

pub use http::KubeClient;
pub use mock::MockControlPlane;
pub use traits::*;

use ades_core::BackendError;

impl ControlPlaneError {
    /// Convert into a backend error tagged with the failing operation.
    pub fn into_backend(self, operation: &str, execution_id: &str) -> BackendError {
        BackendError::ControlPlane {
            operation: operation.to_string(),
            execution_id: execution_id.to_string(),
            message: self.to_string(),
        }
    }
}
