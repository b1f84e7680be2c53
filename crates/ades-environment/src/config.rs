// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for ades-environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// In-cluster service-account token.
pub const SERVICE_ACCOUNT_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
/// In-cluster service-account CA bundle.
pub const SERVICE_ACCOUNT_CA: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// Environment configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Working namespace for all executions
    pub namespace: String,
    /// Service account the access roles are bound to
    pub service_account: String,
    /// Control-plane connection settings
    pub kube: KubeConfig,
    /// CWL runner workload settings
    pub runner: RunnerConfig,
    /// Identifier re-rolls before a submission gives up
    pub max_name_attempts: u32,
    /// What gets deleted on failure and dismissal
    pub cleanup: CleanupPolicy,
    /// Database URL of the process registry
    pub database_url: String,
}

/// Control-plane connection settings.
#[derive(Debug, Clone)]
pub struct KubeConfig {
    /// API server URL, e.g. `https://10.0.0.1:443`
    pub api_url: String,
    /// Bearer token
    pub token: Option<String>,
    /// PEM CA bundle to trust in addition to the system roots
    pub ca_file: Option<PathBuf>,
    /// Accept invalid server certificates
    pub skip_tls_verify: bool,
    /// Per-request timeout
    pub request_timeout: Duration,
}

/// Settings of the CWL runner workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Runner container image
    pub image: String,
    /// `--max-ram` value passed to the runner
    pub max_ram: String,
    /// `--max-cores` value passed to the runner
    pub max_cores: u32,
    /// Storage request of each execution volume
    pub volume_size: String,
    /// Storage class of each execution volume (cluster default when unset)
    pub storage_class: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            image: "pymonger/calrissian:latest".to_string(),
            max_ram: "16G".to_string(),
            max_cores: 8,
            volume_size: "1Gi".to_string(),
            storage_class: None,
        }
    }
}

/// Cleanup of per-execution resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupPolicy {
    /// Delete what a failed submission already created.
    pub rollback_on_failure: bool,
    /// Delete the three volumes when an execution is dismissed.
    pub delete_volumes_on_dismiss: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let namespace = lookup("ADES_NAMESPACE").unwrap_or_else(|| "soamc".to_string());
        let service_account =
            lookup("ADES_SERVICE_ACCOUNT").unwrap_or_else(|| "default".to_string());

        let kube = KubeConfig::from_lookup(&lookup)?;

        let defaults = RunnerConfig::default();
        let runner = RunnerConfig {
            image: lookup("ADES_CWL_RUNNER_IMAGE").unwrap_or(defaults.image),
            max_ram: lookup("ADES_MAX_RAM").unwrap_or(defaults.max_ram),
            max_cores: parse_or(&lookup, "ADES_MAX_CORES", defaults.max_cores)?,
            volume_size: lookup("ADES_VOLUME_SIZE").unwrap_or(defaults.volume_size),
            storage_class: lookup("ADES_STORAGE_CLASS").filter(|s| !s.is_empty()),
        };

        let max_name_attempts: u32 = parse_or(&lookup, "ADES_MAX_NAME_ATTEMPTS", 5)?;
        if max_name_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                var: "ADES_MAX_NAME_ATTEMPTS",
                value: "0".to_string(),
            });
        }

        let cleanup = CleanupPolicy {
            rollback_on_failure: flag(&lookup, "ADES_ROLLBACK_ON_FAILURE"),
            delete_volumes_on_dismiss: flag(&lookup, "ADES_DELETE_VOLUMES_ON_DISMISS"),
        };

        let database_url = lookup("ADES_DATABASE_URL")
            .unwrap_or_else(|| "sqlite:.data/ades.db".to_string());

        Ok(Self {
            namespace,
            service_account,
            kube,
            runner,
            max_name_attempts,
            cleanup,
            database_url,
        })
    }
}

impl KubeConfig {
    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = match lookup("KUBERNETES_API_URL") {
            Some(url) => url,
            None => {
                let host = lookup("KUBERNETES_SERVICE_HOST").ok_or(
                    ConfigError::MissingEnvVar("KUBERNETES_API_URL or KUBERNETES_SERVICE_HOST"),
                )?;
                let port = lookup("KUBERNETES_SERVICE_PORT").unwrap_or_else(|| "443".to_string());
                if host.contains(':') {
                    format!("https://[{}]:{}", host, port)
                } else {
                    format!("https://{}:{}", host, port)
                }
            }
        };

        let token = match (lookup("KUBERNETES_TOKEN"), lookup("KUBERNETES_TOKEN_FILE")) {
            (Some(token), _) => Some(token),
            (None, Some(path)) => Some(read_token(Path::new(&path))?),
            (None, None) => {
                let path = Path::new(SERVICE_ACCOUNT_TOKEN);
                if path.exists() {
                    Some(read_token(path)?)
                } else {
                    None
                }
            }
        };

        let ca_file = lookup("KUBERNETES_CA_FILE").map(PathBuf::from).or_else(|| {
            let path = PathBuf::from(SERVICE_ACCOUNT_CA);
            path.exists().then_some(path)
        });

        let timeout_secs: u64 = parse_or(lookup, "KUBERNETES_REQUEST_TIMEOUT_SECS", 30)?;

        Ok(Self {
            api_url,
            token,
            ca_file,
            skip_tls_verify: flag(lookup, "KUBERNETES_SKIP_TLS_VERIFY"),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn read_token(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path)
        .map(|t| t.trim().to_string())
        .map_err(|source| ConfigError::TokenFile {
            path: path.to_path_buf(),
            source,
        })
}

fn flag<F>(lookup: &F, key: &str) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var: key,
            value,
        }),
        None => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    /// A variable is set but cannot be parsed.
    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
    },
    /// The token file could not be read.
    #[error("Cannot read token file {}: {source}", path.display())]
    TokenFile {
        /// Token file path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}
