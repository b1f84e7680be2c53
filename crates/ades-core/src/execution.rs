// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Execution requests, handles and states.

use chrono::{DateTime, Utc};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::process::{JobControlOption, TransmissionMode};

/// A single input value of an execution request.
///
/// On the wire a secret reference is encoded as JSON `null`: the value is
/// never sent by the caller and is resolved by the backend at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputValue {
    /// Literal value passed through to the workflow.
    Literal(String),
    /// Resolve from backend-managed credentials at runtime.
    SecretRef,
}

impl InputValue {
    /// Create a literal value.
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// Whether this value is the secret-reference sentinel.
    pub fn is_secret(&self) -> bool {
        matches!(self, Self::SecretRef)
    }
}

impl From<Value> for InputValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::SecretRef,
            Value::String(s) => Self::Literal(s),
            other => Self::Literal(other.to_string()),
        }
    }
}

impl Serialize for InputValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Literal(value) => serializer.serialize_str(value),
            Self::SecretRef => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for InputValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

/// Keyed input values in request insertion order.
///
/// Order determines the exact argument sequence handed to the workflow
/// runner, so it is kept as a sequence rather than a map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionInputs(Vec<(String, InputValue)>);

impl ExecutionInputs {
    /// Create an empty input set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an input. A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: InputValue) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((key, value)),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: InputValue) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up an input by key.
    pub fn get(&self, key: &str) -> Option<&InputValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Iterate inputs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &InputValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of inputs.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no inputs.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, InputValue)> for ExecutionInputs {
    fn from_iter<I: IntoIterator<Item = (K, InputValue)>>(iter: I) -> Self {
        let mut inputs = Self::new();
        for (key, value) in iter {
            inputs.insert(key, value);
        }
        inputs
    }
}

impl Serialize for ExecutionInputs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ExecutionInputs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct InputsVisitor;

        impl<'de> Visitor<'de> for InputsVisitor {
            type Value = ExecutionInputs;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of input names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut inputs = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, InputValue>()? {
                    if inputs.iter().any(|(k, _): &(String, InputValue)| *k == key) {
                        return Err(de::Error::custom(format!("duplicate input '{}'", key)));
                    }
                    inputs.push((key, value));
                }
                Ok(ExecutionInputs(inputs))
            }
        }

        deserializer.deserialize_map(InputsVisitor)
    }
}

/// Requested execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Caller waits for the result.
    Sync,
    /// Caller polls the job status.
    #[default]
    Async,
}

impl ExecutionMode {
    /// The job-control option a process must advertise to accept this mode.
    pub fn required_job_control(&self) -> JobControlOption {
        match self {
            Self::Sync => JobControlOption::SyncExecute,
            Self::Async => JobControlOption::AsyncExecute,
        }
    }
}

/// Shape of the execute response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Raw output data.
    Raw,
    /// Status/result document.
    #[default]
    Document,
}

/// Requested delivery of one output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRequest {
    /// Output identifier.
    pub id: String,
    /// Delivery mode.
    #[serde(rename = "transmissionMode", default)]
    pub transmission_mode: TransmissionMode,
}

/// "Execute this process with these inputs."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Target process identifier.
    #[serde(rename = "processID", default)]
    pub process_id: String,
    /// Keyed input values in insertion order.
    #[serde(default)]
    pub inputs: ExecutionInputs,
    /// Requested execution mode.
    #[serde(default)]
    pub mode: ExecutionMode,
    /// Requested response shape.
    #[serde(default)]
    pub response: ResponseType,
    /// Output-transmission preferences.
    #[serde(default)]
    pub outputs: Vec<OutputRequest>,
}

impl ExecutionRequest {
    /// Create an asynchronous request for `process_id`.
    pub fn new(process_id: impl Into<String>, inputs: ExecutionInputs) -> Self {
        Self {
            process_id: process_id.into(),
            inputs,
            mode: ExecutionMode::Async,
            response: ResponseType::Document,
            outputs: Vec::new(),
        }
    }
}

/// Normalized execution state.
///
/// ```text
/// accepted ──► running ──► successful
///    │            │    └─► failed
///    └────────────┴──────► dismissed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    /// Submitted, not yet observed running.
    Accepted,
    /// At least one replica is active.
    Running,
    /// Completed successfully.
    Successful,
    /// Completed with failure.
    Failed,
    /// Cancelled by the caller.
    Dismissed,
}

impl ExecutionState {
    /// Wire representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Running => "running",
            Self::Successful => "successful",
            Self::Failed => "failed",
            Self::Dismissed => "dismissed",
        }
    }

    /// Whether no further transitions can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Successful | Self::Failed | Self::Dismissed)
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accepted" => Ok(Self::Accepted),
            "running" => Ok(Self::Running),
            "successful" => Ok(Self::Successful),
            "failed" => Ok(Self::Failed),
            "dismissed" => Ok(Self::Dismissed),
            other => Err(format!("unknown execution state '{}'", other)),
        }
    }
}

/// Durable reference to the backend resources of one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionHandle {
    /// Execution identifier (also the job identifier seen by callers).
    pub execution_id: String,
    /// Process the execution belongs to.
    pub process_id: String,
    /// Backend type that owns the locator (e.g. "k8s").
    pub backend: String,
    /// Backend-specific resource locator.
    pub locator: Value,
    /// When the execution was submitted.
    pub created_at: DateTime<Utc>,
    /// Raw acceptance response returned by the backend on submission.
    #[serde(default)]
    pub backend_response: Value,
}

/// Location of one execution result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultLink {
    /// Result location.
    pub href: String,
    /// Link relation.
    pub rel: String,
    /// Media type.
    #[serde(rename = "type")]
    pub media_type: String,
    /// Human readable title.
    pub title: String,
}

/// Results of a successful execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResults {
    /// Result locations.
    pub links: Vec<ResultLink>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inputs_keep_document_order() {
        let inputs: ExecutionInputs = serde_json::from_str(
            r#"{"zeta": "1", "alpha": "2", "aws_access_key_id": null, "count": 3}"#,
        )
        .unwrap();

        let keys: Vec<&str> = inputs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "aws_access_key_id", "count"]);
        assert_eq!(inputs.get("aws_access_key_id"), Some(&InputValue::SecretRef));
        assert_eq!(inputs.get("count"), Some(&InputValue::literal("3")));
    }

    #[test]
    fn test_inputs_reject_duplicate_keys() {
        let result = serde_json::from_str::<ExecutionInputs>(r#"{"a": "1", "a": "2"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut inputs = ExecutionInputs::new()
            .with("a", InputValue::literal("1"))
            .with("b", InputValue::literal("2"));
        inputs.insert("a", InputValue::SecretRef);

        let pairs: Vec<_> = inputs.iter().collect();
        assert_eq!(pairs[0], ("a", &InputValue::SecretRef));
        assert_eq!(pairs[1], ("b", &InputValue::literal("2")));
    }

    #[test]
    fn test_secret_serializes_as_null() {
        let inputs = ExecutionInputs::new()
            .with("infile", InputValue::literal("file.txt"))
            .with("token", InputValue::SecretRef);
        assert_eq!(
            serde_json::to_value(&inputs).unwrap(),
            json!({"infile": "file.txt", "token": null})
        );
    }

    #[test]
    fn test_request_defaults() {
        let request: ExecutionRequest =
            serde_json::from_value(json!({"inputs": {"infile": "a.txt"}})).unwrap();
        assert_eq!(request.mode, ExecutionMode::Async);
        assert_eq!(request.response, ResponseType::Document);
        assert!(request.outputs.is_empty());
    }

    #[test]
    fn test_state_terminality() {
        assert!(!ExecutionState::Accepted.is_terminal());
        assert!(!ExecutionState::Running.is_terminal());
        assert!(ExecutionState::Successful.is_terminal());
        assert!(ExecutionState::Failed.is_terminal());
        assert!(ExecutionState::Dismissed.is_terminal());
        assert_eq!(
            "dismissed".parse::<ExecutionState>().unwrap(),
            ExecutionState::Dismissed
        );
    }
}
