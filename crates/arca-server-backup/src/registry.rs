// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The backup job registry.
//!
//! [`BackupService`] is the single source of truth for job definitions and
//! the entry point the HTTP route layer is handed. It owns the in-memory job
//! map (a cache over the [`JobStore`](crate::repository::JobStore)), the
//! scheduler's trigger handles, and the on-demand backup/restore/delete
//! operations that bypass scheduling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use arca_backup_core::{
	validate_cron_expression, BackupJob, BackupType, JobId, JobStatus, SchedulePeriod,
};

use crate::command::{CommandBuilder, CommandPlan};
use crate::config::BackupConfig;
use crate::error::{BackupError, Result};
use crate::executor::{ExecutionOutcome, Executor, JobMap};
use crate::repository::JobStore;
use crate::runner::CommandRunner;
use crate::scheduler::Scheduler;
use crate::uploader::OffsiteUploader;

/// Extensions tried, in order, when deleting an artifact by id.
const ARTIFACT_EXTENSIONS: [&str; 4] = [".tar.gz", ".sql", ".json", ".csv"];

/// Partial update applied to an existing job.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobUpdate {
	pub name: Option<String>,
	pub cron_expression: Option<String>,
	pub period: Option<SchedulePeriod>,
	pub retention_days: Option<u32>,
	pub offsite: Option<bool>,
	pub enabled: Option<bool>,
	pub status: Option<JobStatus>,
}

impl JobUpdate {
	/// Whether applying this update requires re-evaluating the trigger.
	fn needs_reschedule(&self) -> bool {
		self.cron_expression.is_some() || self.enabled.is_some() || self.status.is_some()
	}
}

/// Metadata for one on-disk artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
	pub name: String,
	pub backup_type: BackupType,
	/// Human-readable size, e.g. "3.2M".
	pub size: String,
	pub created: DateTime<Utc>,
}

/// Scheduler view for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
	pub jobs: usize,
	pub scheduled: Vec<String>,
}

pub struct BackupService {
	config: BackupConfig,
	jobs: JobMap,
	store: Arc<dyn JobStore>,
	executor: Arc<Executor>,
	scheduler: Scheduler,
	builder: CommandBuilder,
	runner: Arc<dyn CommandRunner>,
	uploader: Arc<dyn OffsiteUploader>,
}

impl BackupService {
	pub fn new(
		config: BackupConfig,
		store: Arc<dyn JobStore>,
		runner: Arc<dyn CommandRunner>,
		uploader: Arc<dyn OffsiteUploader>,
	) -> Self {
		let jobs: JobMap = Arc::new(RwLock::new(HashMap::new()));
		let executor = Arc::new(Executor::new(
			config.clone(),
			Arc::clone(&jobs),
			Arc::clone(&store),
			Arc::clone(&runner),
			Arc::clone(&uploader),
		));
		let scheduler = Scheduler::new(Arc::clone(&executor));
		let builder = CommandBuilder::new(config.clone());

		Self {
			config,
			jobs,
			store,
			executor,
			scheduler,
			builder,
			runner,
			uploader,
		}
	}

	/// Load persisted jobs into the cache and start triggers for the
	/// schedulable ones. Returns the number of jobs loaded.
	#[instrument(skip(self))]
	pub async fn hydrate(&self) -> Result<usize> {
		let jobs = self.store.list().await?;
		let count = jobs.len();

		for mut job in jobs {
			self.jobs.write().await.insert(job.id, job.clone());
			if job.is_schedulable() {
				match self.scheduler.schedule_job(&job).await {
					Ok(next) => {
						job.next_run = Some(next);
						self.save(&job).await?;
					}
					Err(e) => {
						warn!(job_id = %job.id, error = %e, "persisted job no longer schedulable");
					}
				}
			}
		}

		info!(count, "hydrated backup jobs");
		Ok(count)
	}

	/// Insert a new job; schedulable jobs get a live trigger immediately.
	#[instrument(skip(self, job), fields(job_id = %job.id, name = %job.name))]
	pub async fn add_job(&self, mut job: BackupJob) -> Result<JobId> {
		if job.cron_expression.is_empty() {
			if job.period != SchedulePeriod::Manual {
				return Err(BackupError::NotConfigured(
					"cron expression required for scheduled jobs".to_string(),
				));
			}
		} else {
			validate_cron_expression(&job.cron_expression)?;
		}

		self.store.insert(&job).await?;

		// Publish to the cache before starting the trigger; the trigger loop
		// consults the cache to decide whether to keep firing.
		let id = job.id;
		self.jobs.write().await.insert(id, job.clone());

		if job.is_schedulable() {
			let next = self.scheduler.schedule_job(&job).await?;
			job.next_run = Some(next);
			self.save(&job).await?;
		}

		info!(job_id = %id, "added backup job");
		Ok(id)
	}

	/// Stop any trigger and delete the job. Removing an unknown id is a safe
	/// no-op returning `false`.
	#[instrument(skip(self), fields(job_id = %id))]
	pub async fn remove_job(&self, id: JobId) -> Result<bool> {
		self.scheduler.unschedule_job(id).await;
		let existed = self.jobs.write().await.remove(&id).is_some();
		let deleted = self.store.delete(id).await?;

		if existed || deleted {
			info!(job_id = %id, "removed backup job");
		}
		Ok(existed || deleted)
	}

	/// Merge `update` into the job. Changing the cron expression, enabled
	/// flag, or status re-evaluates the trigger. Unknown id returns `false`.
	#[instrument(skip(self, update), fields(job_id = %id))]
	pub async fn update_job(&self, id: JobId, update: JobUpdate) -> Result<bool> {
		let Some(mut job) = self.jobs.read().await.get(&id).cloned() else {
			return Ok(false);
		};

		if let Some(expression) = &update.cron_expression {
			if !expression.is_empty() {
				validate_cron_expression(expression)?;
			}
		}

		let needs_reschedule = update.needs_reschedule();

		if let Some(name) = update.name {
			job.name = name;
		}
		if let Some(expression) = update.cron_expression {
			job.cron_expression = expression;
		}
		if let Some(period) = update.period {
			job.period = period;
		}
		if let Some(retention_days) = update.retention_days {
			job.retention_days = retention_days;
		}
		if let Some(offsite) = update.offsite {
			job.offsite = offsite;
		}
		if let Some(enabled) = update.enabled {
			job.enabled = enabled;
		}
		if let Some(status) = update.status {
			job.status = status;
		}
		job.updated_at = Utc::now();

		if needs_reschedule {
			self.scheduler.unschedule_job(id).await;
			if job.is_schedulable() {
				// The merged job must be in the cache before the trigger
				// starts, or its first schedulability check sees stale state.
				self.jobs.write().await.insert(id, job.clone());
				job.next_run = Some(self.scheduler.schedule_job(&job).await?);
			} else {
				job.next_run = None;
			}
		}

		self.save(&job).await?;
		Ok(true)
	}

	/// Flip between `active` and `paused` without touching `enabled`.
	/// An errored job is revived to `active`.
	#[instrument(skip(self), fields(job_id = %id))]
	pub async fn toggle_job(&self, id: JobId) -> Result<bool> {
		let Some(job) = self.jobs.read().await.get(&id).cloned() else {
			return Ok(false);
		};

		let status = match job.status {
			JobStatus::Active => JobStatus::Paused,
			JobStatus::Paused | JobStatus::Error => JobStatus::Active,
		};

		self.update_job(
			id,
			JobUpdate {
				status: Some(status),
				..JobUpdate::default()
			},
		)
		.await
	}

	/// Retention applied when a new job doesn't specify its own.
	pub fn default_retention_days(&self) -> u32 {
		self.config.default_retention_days
	}

	pub async fn list_jobs(&self) -> Vec<BackupJob> {
		let mut jobs: Vec<BackupJob> = self.jobs.read().await.values().cloned().collect();
		jobs.sort_by_key(|j| j.created_at);
		jobs
	}

	pub async fn get_job(&self, id: JobId) -> Option<BackupJob> {
		self.jobs.read().await.get(&id).cloned()
	}

	/// Run one fire of a job now, through the same pipeline (and overlap
	/// guard) as a scheduled fire.
	pub async fn run_job(&self, id: JobId) -> Result<ExecutionOutcome> {
		self.executor.execute(id).await
	}

	/// One-off backup of `backup_type`, outside any job: no `last_run`, no
	/// retention bookkeeping. Returns the artifact filename.
	#[instrument(skip(self))]
	pub async fn create_manual_backup(&self, backup_type: BackupType) -> Result<String> {
		let timeout = self.config.command_timeout();
		let plan = self
			.builder
			.build(backup_type, Utc::now(), self.runner.as_ref(), timeout)
			.await?;

		if let CommandPlan::Shell { command, staging, .. } = &plan {
			self.runner.run(command, timeout).await?;
			if let Some(staging) = staging {
				if let Err(e) = tokio::fs::remove_dir_all(staging).await {
					warn!(staging = %staging.display(), error = %e, "failed to remove staging directory");
				}
			}
		}

		let name = plan
			.artifact()
			.file_name()
			.map(|n| n.to_string_lossy().into_owned())
			.ok_or_else(|| BackupError::Internal("artifact has no file name".to_string()))?;

		info!(artifact = %name, "manual backup completed");
		Ok(name)
	}

	/// Restore the artifact `{id}{ext}` of the given type. Full archives are
	/// unpacked under `{root}/restore/{id}`.
	#[instrument(skip(self))]
	pub async fn restore_backup(&self, id: &str, backup_type: BackupType) -> Result<()> {
		let artifact = self
			.config
			.root
			.join(format!("{id}{}", backup_type.extension()));
		if tokio::fs::metadata(&artifact).await.is_err() {
			return Err(BackupError::ArtifactNotFound(id.to_string()));
		}

		let target = self.config.root.join("restore").join(id);
		if backup_type == BackupType::Full {
			tokio::fs::create_dir_all(&target).await?;
		}

		let command = self.builder.restore_command(backup_type, &artifact, &target)?;
		self.runner.run(&command, self.config.command_timeout()).await?;

		info!(artifact = %artifact.display(), "restore completed");
		Ok(())
	}

	/// Delete the artifact for `id`, trying known extensions in a fixed
	/// order. Returns `false` when nothing matched.
	#[instrument(skip(self))]
	pub async fn delete_backup(&self, id: &str) -> Result<bool> {
		for extension in ARTIFACT_EXTENSIONS {
			let path = self.config.root.join(format!("{id}{extension}"));
			let Ok(metadata) = tokio::fs::metadata(&path).await else {
				continue;
			};

			if metadata.is_dir() {
				tokio::fs::remove_dir_all(&path).await?;
			} else {
				tokio::fs::remove_file(&path).await?;
			}

			// The offsite copy goes too; a failure there must not resurrect
			// the local deletion.
			let name = format!("{id}{extension}");
			if let Err(e) = self.uploader.delete(&name).await {
				warn!(artifact = %name, error = %e, "failed to delete offsite copy");
			}

			info!(artifact = %path.display(), "deleted backup artifact");
			return Ok(true);
		}

		Ok(false)
	}

	/// List local artifacts with inferred type, human-readable size, and
	/// creation time, newest first.
	#[instrument(skip(self))]
	pub async fn backup_files(&self) -> Result<Vec<ArtifactInfo>> {
		let mut artifacts = Vec::new();

		let mut entries = match tokio::fs::read_dir(&self.config.root).await {
			Ok(entries) => entries,
			// No backup has run yet.
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(artifacts),
			Err(e) => return Err(e.into()),
		};
		while let Some(entry) = entries.next_entry().await? {
			let name = entry.file_name().to_string_lossy().into_owned();
			let Some(backup_type) = BackupType::infer_from_file_name(&name) else {
				continue;
			};
			let metadata = match entry.metadata().await {
				Ok(m) => m,
				Err(e) => {
					warn!(artifact = %name, error = %e, "could not stat artifact");
					continue;
				}
			};
			if !metadata.is_file() {
				continue;
			}

			let created = metadata
				.modified()
				.map(DateTime::<Utc>::from)
				.unwrap_or_else(|_| Utc::now());
			artifacts.push(ArtifactInfo {
				name,
				backup_type,
				size: format_size(metadata.len()),
				created,
			});
		}

		artifacts.sort_by(|a, b| b.created.cmp(&a.created));
		Ok(artifacts)
	}

	pub async fn status(&self) -> SchedulerStatus {
		SchedulerStatus {
			jobs: self.jobs.read().await.len(),
			scheduled: self
				.scheduler
				.scheduled_ids()
				.await
				.into_iter()
				.map(|id| id.to_string())
				.collect(),
		}
	}

	/// Stop all triggers; in-flight runs complete first.
	pub async fn shutdown(&self) {
		self.scheduler.shutdown().await;
	}

	async fn save(&self, job: &BackupJob) -> Result<()> {
		self.jobs.write().await.insert(job.id, job.clone());
		self.store.update(job).await
	}
}

fn format_size(size: u64) -> String {
	const KB: u64 = 1024;
	const MB: u64 = KB * 1024;
	const GB: u64 = MB * 1024;

	if size >= GB {
		format!("{:.1}G", size as f64 / GB as f64)
	} else if size >= MB {
		format!("{:.1}M", size as f64 / MB as f64)
	} else if size >= KB {
		format!("{:.1}K", size as f64 / KB as f64)
	} else {
		format!("{size}")
	}
}
