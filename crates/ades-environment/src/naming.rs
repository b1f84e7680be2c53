// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Resource naming.
//!
//! Every execution gets one random identifier; all of its cluster resources
//! are named from it so they can be located and torn down together.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Default identifier length.
pub const DEFAULT_ID_LENGTH: usize = 12;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Random identifier over `[a-z0-9]` of the given length.
///
/// Legal as (part of) a Kubernetes resource name. Uniqueness is not
/// guaranteed; callers must handle "already exists" and retry.
pub fn generate_id(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Source of execution identifiers.
pub trait IdGenerator: Send + Sync {
    /// Next identifier to try.
    fn next_id(&self) -> String;
}

/// Uniformly random identifiers (the production generator).
#[derive(Debug, Clone)]
pub struct RandomIds {
    length: usize,
}

impl RandomIds {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Default for RandomIds {
    fn default() -> Self {
        Self::new(DEFAULT_ID_LENGTH)
    }
}

impl IdGenerator for RandomIds {
    fn next_id(&self) -> String {
        generate_id(self.length)
    }
}

/// Names of every resource of one execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionNames {
    pub execution_id: String,
    pub input_volume: String,
    pub tmpout_volume: String,
    pub output_volume: String,
    pub job: String,
}

impl ExecutionNames {
    pub fn from_id(execution_id: impl Into<String>) -> Self {
        let id = execution_id.into();
        Self {
            input_volume: format!("input-data-{}", id),
            tmpout_volume: format!("tmpout-{}", id),
            output_volume: format!("output-data-{}", id),
            job: format!("job-{}", id),
            execution_id: id,
        }
    }

    /// Volume claim names in creation order.
    pub fn volumes(&self) -> [&str; 3] {
        [&self.input_volume, &self.tmpout_volume, &self.output_volume]
    }
}
