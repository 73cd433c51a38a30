// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Backup execution pipeline.
//!
//! `execute` runs the strictly-sequential pipeline for one job: record the
//! run start, build the command, run it, mirror off-site, apply retention,
//! recompute the next run. A failed command is terminal for that run (no
//! upload, no cleanup, `next_run` untouched) and marks the job `error`.
//! Overlapping fires of the same job are skipped via a single-flight guard.

use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;
use tracing::{info, warn};

use arca_backup_core::{BackupJob, JobId, JobStatus, next_occurrence};

use crate::command::{CommandBuilder, CommandPlan};
use crate::config::BackupConfig;
use crate::error::{BackupError, Result};
use crate::retention;
use crate::runner::CommandRunner;
use crate::uploader::OffsiteUploader;

/// Shared job cache; the registry owns the authoritative copy.
pub(crate) type JobMap = Arc<RwLock<HashMap<JobId, BackupJob>>>;

/// How a requested execution ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
	Completed { artifact: PathBuf },
	/// A previous fire of the same job is still running.
	SkippedOverlap,
}

pub struct Executor {
	config: BackupConfig,
	builder: CommandBuilder,
	runner: Arc<dyn CommandRunner>,
	uploader: Arc<dyn OffsiteUploader>,
	store: Arc<dyn crate::repository::JobStore>,
	jobs: JobMap,
	in_flight: Mutex<HashSet<JobId>>,
}

impl Executor {
	pub fn new(
		config: BackupConfig,
		jobs: JobMap,
		store: Arc<dyn crate::repository::JobStore>,
		runner: Arc<dyn CommandRunner>,
		uploader: Arc<dyn OffsiteUploader>,
	) -> Self {
		let builder = CommandBuilder::new(config.clone());
		Self {
			config,
			builder,
			runner,
			uploader,
			store,
			jobs,
			in_flight: Mutex::new(HashSet::new()),
		}
	}

	/// Execute one run of the job, skipping if a run of the same job is
	/// already in flight.
	pub async fn execute(&self, id: JobId) -> Result<ExecutionOutcome> {
		// The guard frees the slot on drop, so a trigger abort that cancels
		// the run mid-pipeline cannot wedge the job as permanently in flight.
		let Some(_guard) = InFlightGuard::acquire(&self.in_flight, id) else {
			warn!(job_id = %id, "backup still running, skipping overlapping fire");
			return Ok(ExecutionOutcome::SkippedOverlap);
		};

		self.run_pipeline(id).await
	}

	/// Whether the cached job still qualifies for scheduled fires.
	pub(crate) async fn job_is_schedulable(&self, id: JobId) -> bool {
		self.jobs
			.read()
			.await
			.get(&id)
			.map(|job| job.is_schedulable())
			.unwrap_or(false)
	}

	async fn run_pipeline(&self, id: JobId) -> Result<ExecutionOutcome> {
		let Some(mut job) = self.jobs.read().await.get(&id).cloned() else {
			return Err(BackupError::JobNotFound(id));
		};

		// Record the start before any work so a crash mid-run stays visible.
		let started = Utc::now();
		job.last_run = Some(started);
		job.updated_at = started;
		self.persist(&job).await?;

		info!(job_id = %id, name = %job.name, backup_type = %job.backup_type, "starting backup run");

		let timeout = self.config.command_timeout();
		let plan = match self
			.builder
			.build(job.backup_type, started, self.runner.as_ref(), timeout)
			.await
		{
			Ok(plan) => plan,
			Err(e) => return self.fail(job, e).await,
		};
		let artifact = plan.artifact().to_path_buf();

		if let CommandPlan::Shell { command, staging, .. } = &plan {
			if let Err(e) = self.runner.run(command, timeout).await {
				return self.fail(job, e).await;
			}
			if let Some(staging) = staging {
				if let Err(e) = tokio::fs::remove_dir_all(staging).await {
					warn!(staging = %staging.display(), error = %e, "failed to remove staging directory");
				}
			}
		}

		// Off-site mirroring is best-effort; the local artifact defines
		// success.
		if job.offsite {
			if let Err(e) = self.uploader.upload(&artifact).await {
				warn!(job_id = %id, artifact = %artifact.display(), error = %e, "off-site upload failed");
			}
		}

		match retention::cleanup_expired(
			&self.config.root,
			job.backup_type,
			job.retention_days,
			Utc::now(),
		)
		.await
		{
			Ok(deleted) if deleted > 0 => {
				info!(job_id = %id, deleted, retention_days = job.retention_days, "retention cleanup done");
			}
			Ok(_) => {}
			Err(e) => warn!(job_id = %id, error = %e, "retention cleanup failed"),
		}

		match next_occurrence(&job.cron_expression, started) {
			Ok(next) => job.next_run = Some(next),
			Err(e) => {
				warn!(job_id = %id, error = %e, "could not compute next run");
				job.next_run = None;
			}
		}
		job.updated_at = Utc::now();
		self.persist(&job).await?;

		info!(job_id = %id, artifact = %artifact.display(), "backup run completed");
		Ok(ExecutionOutcome::Completed { artifact })
	}

	/// Terminal failure for this run: mark the job errored, leave `next_run`
	/// as it was, and surface the error.
	async fn fail(&self, mut job: BackupJob, error: BackupError) -> Result<ExecutionOutcome> {
		warn!(job_id = %job.id, error = %error, "backup run failed");
		job.status = JobStatus::Error;
		job.updated_at = Utc::now();
		if let Err(e) = self.persist(&job).await {
			warn!(job_id = %job.id, error = %e, "failed to persist error status");
		}
		Err(error)
	}

	async fn persist(&self, job: &BackupJob) -> Result<()> {
		self.jobs.write().await.insert(job.id, job.clone());
		self.store.update(job).await
	}
}

/// Holds a job's single-flight slot; released on drop, including when the
/// owning future is cancelled.
struct InFlightGuard<'a> {
	slots: &'a Mutex<HashSet<JobId>>,
	id: JobId,
}

impl<'a> InFlightGuard<'a> {
	fn acquire(slots: &'a Mutex<HashSet<JobId>>, id: JobId) -> Option<Self> {
		let mut set = slots.lock().unwrap_or_else(PoisonError::into_inner);
		if !set.insert(id) {
			return None;
		}
		Some(Self { slots, id })
	}
}

impl Drop for InFlightGuard<'_> {
	fn drop(&mut self) {
		self.slots
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.remove(&self.id);
	}
}
