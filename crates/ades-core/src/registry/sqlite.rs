// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite-backed registry implementation.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use super::{JobRecord, ProcessRegistry, RegistryError, Result};
use crate::execution::{ExecutionHandle, ExecutionState};
use crate::process::ProcessDescriptor;

const SCHEMA: &str = include_str!("../../migrations/schema.sql");

/// SQLite-backed process registry.
#[derive(Clone)]
pub struct SqliteRegistry {
    pool: SqlitePool,
}

impl SqliteRegistry {
    /// Create a registry from an existing pool. The schema must already exist;
    /// see [`SqliteRegistry::migrate`].
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` (e.g. `sqlite:.data/ades.db`), creating the
    /// database file and its directory if needed, and apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        Self::connect_with(options).await
    }

    /// Open (creating if needed) a database file and apply the schema.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        Self::connect_with(options).await
    }

    async fn connect_with(options: SqliteConnectOptions) -> Result<Self> {
        if let Some(parent) = options.get_filename().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                RegistryError::Corrupt(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let registry = Self { pool };
        registry.migrate().await?;
        Ok(registry)
    }

    /// In-memory database (single connection so every query sees the schema).
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let registry = Self { pool };
        registry.migrate().await?;
        Ok(registry)
    }

    /// Create the tables if they do not exist.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn split<T: std::str::FromStr<Err = String>>(raw: &str) -> Result<Vec<T>> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<T>().map_err(RegistryError::Corrupt))
        .collect()
}

fn process_from_row(row: &SqliteRow) -> Result<ProcessDescriptor> {
    let keywords: String = row.try_get("keywords")?;
    let job_control: String = row.try_get("job_control_options")?;
    let transmission: String = row.try_get("output_transmission")?;

    Ok(ProcessDescriptor {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        abstract_text: row.try_get("abstract")?,
        keywords: serde_json::from_str(&keywords)?,
        ows_context_url: row.try_get("ows_context_url")?,
        process_version: row.try_get("process_version")?,
        job_control_options: split(&job_control)?,
        output_transmission: split(&transmission)?,
        immediate_deployment: row.try_get("immediate_deployment")?,
        execution_unit: row.try_get("execution_unit")?,
    })
}

fn job_from_row(row: &SqliteRow) -> Result<JobRecord> {
    let status: String = row.try_get("status")?;
    let handle: String = row.try_get("handle")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(JobRecord {
        job_id: row.try_get("job_id")?,
        process_id: row.try_get("process_id")?,
        status: status
            .parse::<ExecutionState>()
            .map_err(RegistryError::Corrupt)?,
        handle: serde_json::from_str::<ExecutionHandle>(&handle)?,
        created_at,
        updated_at,
    })
}

const PROCESS_COLUMNS: &str = "id, title, abstract, keywords, ows_context_url, process_version, \
     job_control_options, output_transmission, immediate_deployment, execution_unit";

const JOB_COLUMNS: &str = "job_id, process_id, status, handle, created_at, updated_at";

#[async_trait]
impl ProcessRegistry for SqliteRegistry {
    async fn deploy_process(&self, process: &ProcessDescriptor) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO processes (id, title, abstract, keywords, ows_context_url, process_version,
                                   job_control_options, output_transmission, immediate_deployment,
                                   execution_unit)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&process.id)
        .bind(&process.title)
        .bind(&process.abstract_text)
        .bind(serde_json::to_string(&process.keywords)?)
        .bind(&process.ows_context_url)
        .bind(&process.process_version)
        .bind(join(&process.job_control_options))
        .bind(join(&process.output_transmission))
        .bind(process.immediate_deployment)
        .bind(&process.execution_unit)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(RegistryError::ProcessAlreadyExists(process.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_processes(&self) -> Result<Vec<ProcessDescriptor>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM processes ORDER BY rowid",
            PROCESS_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(process_from_row).collect()
    }

    async fn get_process(&self, process_id: &str) -> Result<Option<ProcessDescriptor>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM processes WHERE id = ?",
            PROCESS_COLUMNS
        ))
        .bind(process_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(process_from_row).transpose()
    }

    async fn undeploy_process(&self, process_id: &str) -> Result<ProcessDescriptor> {
        let process = self
            .get_process(process_id)
            .await?
            .ok_or_else(|| RegistryError::ProcessNotFound(process_id.to_string()))?;

        sqlx::query("DELETE FROM processes WHERE id = ?")
            .bind(process_id)
            .execute(&self.pool)
            .await?;

        Ok(process)
    }

    async fn insert_job(&self, job: &JobRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (job_id, process_id, status, handle, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.job_id)
        .bind(&job.process_id)
        .bind(job.status.as_str())
        .bind(serde_json::to_string(&job.handle)?)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_job(&self, process_id: &str, job_id: &str) -> Result<Option<JobRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM jobs WHERE process_id = ? AND job_id = ?",
            JOB_COLUMNS
        ))
        .bind(process_id)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(job_from_row).transpose()
    }

    async fn list_jobs(&self, process_id: &str) -> Result<Vec<JobRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM jobs WHERE process_id = ? ORDER BY created_at, rowid",
            JOB_COLUMNS
        ))
        .bind(process_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(job_from_row).collect()
    }

    async fn update_job_status(
        &self,
        process_id: &str,
        job_id: &str,
        status: ExecutionState,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = ?, updated_at = ?
            WHERE process_id = ? AND job_id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(process_id)
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::JobNotFound {
                process_id: process_id.to_string(),
                job_id: job_id.to_string(),
            });
        }
        Ok(())
    }
}
