// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Recurring trigger management.
//!
//! Maps each job id to at most one live trigger task. A trigger loop computes
//! the next cron occurrence, sleeps until it, and hands the fire to the
//! executor; the executor's single-flight guard keeps a slow run from piling
//! up duplicates, so the loop itself never blocks future fires. Before every
//! iteration the loop re-checks the cached job and retires itself once the
//! job is no longer schedulable (disabled, paused, or errored by a failed
//! run), so a failing job stops firing without outside help.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use arca_backup_core::{next_occurrence, BackupJob, JobId};

use crate::error::Result;
use crate::executor::Executor;

/// A live trigger task. The generation distinguishes a retired task's
/// self-removal from a replacement that has since taken the slot.
struct TriggerHandle {
	generation: u64,
	handle: JoinHandle<()>,
}

pub struct Scheduler {
	executor: Arc<Executor>,
	handles: Arc<Mutex<HashMap<JobId, TriggerHandle>>>,
	generation: AtomicU64,
	shutdown_tx: broadcast::Sender<()>,
}

impl Scheduler {
	pub fn new(executor: Arc<Executor>) -> Self {
		let (shutdown_tx, _) = broadcast::channel(1);
		Self {
			executor,
			handles: Arc::new(Mutex::new(HashMap::new())),
			generation: AtomicU64::new(0),
			shutdown_tx,
		}
	}

	/// Start (or replace) the recurring trigger for `job` and return its
	/// first upcoming run time.
	///
	/// Re-scheduling an already-scheduled id stops the old trigger first;
	/// there is never more than one live trigger per id. The job must already
	/// be visible in the executor's cache or the trigger retires immediately.
	pub async fn schedule_job(&self, job: &BackupJob) -> Result<DateTime<Utc>> {
		let first = next_occurrence(&job.cron_expression, Utc::now())?;

		let id = job.id;
		let generation = self.generation.fetch_add(1, Ordering::Relaxed);
		let expression = job.cron_expression.clone();
		let executor = Arc::clone(&self.executor);
		let trigger_handles = Arc::clone(&self.handles);
		let mut shutdown_rx = self.shutdown_tx.subscribe();

		let handle = tokio::spawn(async move {
			loop {
				if !executor.job_is_schedulable(id).await {
					info!(job_id = %id, "job no longer schedulable, retiring trigger");
					break;
				}

				let now = Utc::now();
				let next = match next_occurrence(&expression, now) {
					Ok(next) => next,
					Err(e) => {
						warn!(job_id = %id, error = %e, "stopping trigger, cron expression no longer evaluates");
						break;
					}
				};
				let wait = (next - now).to_std().unwrap_or_default();

				tokio::select! {
					_ = tokio::time::sleep(wait) => {
						if let Err(e) = executor.execute(id).await {
							warn!(job_id = %id, error = %e, "scheduled backup failed");
						}
					}
					_ = shutdown_rx.recv() => {
						debug!(job_id = %id, "stopping trigger on shutdown");
						// Shutdown drains the handle map itself.
						return;
					}
				}
			}

			// Retired on its own; drop this trigger's map entry unless a
			// replacement already owns the slot.
			let mut handles = trigger_handles.lock().await;
			if handles.get(&id).map(|t| t.generation) == Some(generation) {
				handles.remove(&id);
			}
		});

		let mut handles = self.handles.lock().await;
		if let Some(old) = handles.remove(&id) {
			debug!(job_id = %id, "replacing existing trigger");
			old.handle.abort();
		}
		handles.insert(id, TriggerHandle { generation, handle });

		info!(job_id = %id, cron = %job.cron_expression, next_run = %first, "scheduled backup job");
		Ok(first)
	}

	/// Stop and discard the trigger for `id`, if any.
	pub async fn unschedule_job(&self, id: JobId) -> bool {
		match self.handles.lock().await.remove(&id) {
			Some(trigger) => {
				trigger.handle.abort();
				info!(job_id = %id, "unscheduled backup job");
				true
			}
			None => false,
		}
	}

	pub async fn is_scheduled(&self, id: JobId) -> bool {
		self.handles.lock().await.contains_key(&id)
	}

	pub async fn scheduled_ids(&self) -> Vec<JobId> {
		self.handles.lock().await.keys().copied().collect()
	}

	/// Stop all triggers. In-flight executions run to completion.
	pub async fn shutdown(&self) {
		let _ = self.shutdown_tx.send(());

		// Drain under the lock, await outside it; a concurrently retiring
		// trigger also takes this lock for its own removal.
		let drained: Vec<TriggerHandle> = {
			let mut handles = self.handles.lock().await;
			handles.drain().map(|(_, trigger)| trigger).collect()
		};
		for trigger in drained {
			let _ = trigger.handle.await;
		}

		info!("backup scheduler shut down");
	}
}
