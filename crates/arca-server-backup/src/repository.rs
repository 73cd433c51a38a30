// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Persistence layer for backup job definitions.
//!
//! The registry's in-memory map is a cache over this store; jobs and their
//! `last_run`/`next_run`/`status` survive process restarts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::instrument;

use arca_backup_core::{BackupJob, JobId};

use crate::error::{BackupError, Result};

/// Store trait for backup job definitions.
#[async_trait]
pub trait JobStore: Send + Sync {
	async fn insert(&self, job: &BackupJob) -> Result<()>;
	async fn update(&self, job: &BackupJob) -> Result<()>;
	async fn delete(&self, id: JobId) -> Result<bool>;
	async fn get(&self, id: JobId) -> Result<Option<BackupJob>>;
	async fn list(&self) -> Result<Vec<BackupJob>>;
}

/// Create the backup job schema if it doesn't exist.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS backup_jobs (
			id TEXT PRIMARY KEY,
			name TEXT NOT NULL,
			backup_type TEXT NOT NULL,
			period TEXT NOT NULL,
			cron_expression TEXT NOT NULL,
			last_run TEXT,
			next_run TEXT,
			status TEXT NOT NULL,
			retention_days INTEGER NOT NULL,
			offsite INTEGER NOT NULL,
			enabled INTEGER NOT NULL,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	Ok(())
}

/// SQLite implementation of the job store.
#[derive(Clone)]
pub struct SqliteJobStore {
	pool: SqlitePool,
}

impl SqliteJobStore {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

#[async_trait]
impl JobStore for SqliteJobStore {
	#[instrument(skip(self, job), fields(job_id = %job.id, name = %job.name))]
	async fn insert(&self, job: &BackupJob) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO backup_jobs (
				id, name, backup_type, period, cron_expression,
				last_run, next_run, status,
				retention_days, offsite, enabled,
				created_at, updated_at
			)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(job.id.to_string())
		.bind(&job.name)
		.bind(job.backup_type.to_string())
		.bind(job.period.to_string())
		.bind(&job.cron_expression)
		.bind(job.last_run.map(|dt| dt.to_rfc3339()))
		.bind(job.next_run.map(|dt| dt.to_rfc3339()))
		.bind(job.status.to_string())
		.bind(job.retention_days as i64)
		.bind(job.offsite)
		.bind(job.enabled)
		.bind(job.created_at.to_rfc3339())
		.bind(job.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[instrument(skip(self, job), fields(job_id = %job.id))]
	async fn update(&self, job: &BackupJob) -> Result<()> {
		sqlx::query(
			r#"
			UPDATE backup_jobs
			SET name = ?, backup_type = ?, period = ?, cron_expression = ?,
				last_run = ?, next_run = ?, status = ?,
				retention_days = ?, offsite = ?, enabled = ?,
				updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(&job.name)
		.bind(job.backup_type.to_string())
		.bind(job.period.to_string())
		.bind(&job.cron_expression)
		.bind(job.last_run.map(|dt| dt.to_rfc3339()))
		.bind(job.next_run.map(|dt| dt.to_rfc3339()))
		.bind(job.status.to_string())
		.bind(job.retention_days as i64)
		.bind(job.offsite)
		.bind(job.enabled)
		.bind(job.updated_at.to_rfc3339())
		.bind(job.id.to_string())
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[instrument(skip(self), fields(job_id = %id))]
	async fn delete(&self, id: JobId) -> Result<bool> {
		let result = sqlx::query("DELETE FROM backup_jobs WHERE id = ?")
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}

	#[instrument(skip(self), fields(job_id = %id))]
	async fn get(&self, id: JobId) -> Result<Option<BackupJob>> {
		let row = sqlx::query_as::<_, JobRow>(
			r#"
			SELECT id, name, backup_type, period, cron_expression,
				   last_run, next_run, status,
				   retention_days, offsite, enabled,
				   created_at, updated_at
			FROM backup_jobs
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self))]
	async fn list(&self) -> Result<Vec<BackupJob>> {
		let rows = sqlx::query_as::<_, JobRow>(
			r#"
			SELECT id, name, backup_type, period, cron_expression,
				   last_run, next_run, status,
				   retention_days, offsite, enabled,
				   created_at, updated_at
			FROM backup_jobs
			ORDER BY created_at ASC
			"#,
		)
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}
}

#[derive(sqlx::FromRow)]
struct JobRow {
	id: String,
	name: String,
	backup_type: String,
	period: String,
	cron_expression: String,
	last_run: Option<String>,
	next_run: Option<String>,
	status: String,
	retention_days: i64,
	offsite: bool,
	enabled: bool,
	created_at: String,
	updated_at: String,
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| BackupError::Internal(format!("invalid timestamp {value}: {e}")))
}

impl TryFrom<JobRow> for BackupJob {
	type Error = BackupError;

	fn try_from(row: JobRow) -> Result<Self> {
		Ok(BackupJob {
			id: JobId::from_str(&row.id)
				.map_err(|e| BackupError::Internal(format!("invalid job id {}: {e}", row.id)))?,
			name: row.name,
			backup_type: row.backup_type.parse()?,
			period: row.period.parse()?,
			cron_expression: row.cron_expression,
			last_run: row.last_run.as_deref().map(parse_timestamp).transpose()?,
			next_run: row.next_run.as_deref().map(parse_timestamp).transpose()?,
			status: row.status.parse()?,
			retention_days: row.retention_days as u32,
			offsite: row.offsite,
			enabled: row.enabled,
			created_at: parse_timestamp(&row.created_at)?,
			updated_at: parse_timestamp(&row.updated_at)?,
		})
	}
}
