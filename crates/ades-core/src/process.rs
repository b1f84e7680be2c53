// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Process descriptors.
//!
//! A process descriptor is the registered metadata of an executable workflow.
//! It is immutable once registered; backends only read the identifier and the
//! workflow-context reference (`owsContextURL`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Job-control modes a process can advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobControlOption {
    /// Synchronous execution (caller waits for the result).
    SyncExecute,
    /// Asynchronous execution (caller polls the job status).
    AsyncExecute,
    /// Running jobs may be dismissed.
    Dismiss,
}

impl JobControlOption {
    /// Wire representation of the option.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SyncExecute => "sync-execute",
            Self::AsyncExecute => "async-execute",
            Self::Dismiss => "dismiss",
        }
    }
}

impl fmt::Display for JobControlOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobControlOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "sync-execute" => Ok(Self::SyncExecute),
            "async-execute" => Ok(Self::AsyncExecute),
            "dismiss" => Ok(Self::Dismiss),
            other => Err(format!("unknown job control option '{}'", other)),
        }
    }
}

/// How a process output is delivered to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransmissionMode {
    /// Inline value in the response.
    Value,
    /// Link to the stored output.
    #[default]
    Reference,
}

impl TransmissionMode {
    /// Wire representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Reference => "reference",
        }
    }
}

impl fmt::Display for TransmissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransmissionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "value" => Ok(Self::Value),
            "reference" => Ok(Self::Reference),
            other => Err(format!("unknown transmission mode '{}'", other)),
        }
    }
}

/// Registered metadata describing an executable workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDescriptor {
    /// Process identifier (registry key).
    pub id: String,
    /// Human readable title.
    #[serde(default)]
    pub title: String,
    /// Free-form description.
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    /// Search keywords.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// URL of the workflow definition (CWL document) to execute.
    #[serde(rename = "owsContextURL")]
    pub ows_context_url: String,
    /// Process version.
    #[serde(rename = "processVersion", default)]
    pub process_version: String,
    /// Supported job-control modes.
    #[serde(rename = "jobControlOptions", default)]
    pub job_control_options: Vec<JobControlOption>,
    /// Supported output-transmission modes.
    #[serde(rename = "outputTransmission", default)]
    pub output_transmission: Vec<TransmissionMode>,
    /// Whether the process is deployed immediately on registration.
    #[serde(rename = "immediateDeployment", default)]
    pub immediate_deployment: bool,
    /// Reference to the execution unit (container image or package).
    #[serde(rename = "executionUnit", default)]
    pub execution_unit: String,
}

impl ProcessDescriptor {
    /// Create a descriptor with the required fields and permissive defaults.
    pub fn new(id: impl Into<String>, ows_context_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            abstract_text: String::new(),
            keywords: Vec::new(),
            ows_context_url: ows_context_url.into(),
            process_version: String::new(),
            job_control_options: vec![
                JobControlOption::AsyncExecute,
                JobControlOption::Dismiss,
            ],
            output_transmission: vec![TransmissionMode::Reference],
            immediate_deployment: true,
            execution_unit: String::new(),
        }
    }

    /// Whether the process accepts the given job-control mode.
    ///
    /// A descriptor that declares no modes accepts all of them.
    pub fn supports(&self, option: JobControlOption) -> bool {
        self.job_control_options.is_empty() || self.job_control_options.contains(&option)
    }
}
