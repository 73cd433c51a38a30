// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Backup HTTP handlers.
//!
//! Each handler maps 1:1 onto a `BackupService` operation and returns the
//! `{"success": ..}` envelope; failures go through
//! [`ServerError`](crate::error::ServerError) for status mapping.

use axum::{
	extract::{Path, State},
	Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use arca_backup_core::{BackupJob, BackupType, JobId, SchedulePeriod};
use arca_server_backup::{ArtifactInfo, BackupError, ExecutionOutcome, JobUpdate};

use crate::api::AppState;
use crate::error::ServerError;

fn parse_job_id(raw: &str) -> Result<JobId, ServerError> {
	raw.parse()
		.map_err(|_| ServerError::BadRequest(format!("invalid job id '{raw}'")))
}

#[derive(Debug, Serialize)]
pub struct FilesResponse {
	pub success: bool,
	pub files: Vec<ArtifactInfo>,
}

/// GET /api/backup/files
pub async fn list_files(State(state): State<AppState>) -> Result<Json<FilesResponse>, ServerError> {
	let files = state.service.backup_files().await?;
	Ok(Json(FilesResponse {
		success: true,
		files,
	}))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
	pub success: bool,
	pub jobs: usize,
	pub scheduled: Vec<String>,
}

/// GET /api/backup/status
pub async fn scheduler_status(State(state): State<AppState>) -> Json<StatusResponse> {
	let status = state.service.status().await;
	Json(StatusResponse {
		success: true,
		jobs: status.jobs,
		scheduled: status.scheduled,
	})
}

#[derive(Debug, Deserialize)]
pub struct CreateBackupRequest {
	pub backup_type: BackupType,
}

#[derive(Debug, Serialize)]
pub struct CreateBackupResponse {
	pub success: bool,
	pub file: String,
}

/// POST /api/backup/create
#[instrument(skip(state))]
pub async fn create_backup(
	State(state): State<AppState>,
	Json(request): Json<CreateBackupRequest>,
) -> Result<Json<CreateBackupResponse>, ServerError> {
	let file = state.service.create_manual_backup(request.backup_type).await?;
	Ok(Json(CreateBackupResponse {
		success: true,
		file,
	}))
}

#[derive(Debug, Deserialize)]
pub struct RestoreBackupRequest {
	pub id: String,
	pub backup_type: BackupType,
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
	pub success: bool,
}

/// POST /api/backup/restore
#[instrument(skip(state), fields(id = %request.id))]
pub async fn restore_backup(
	State(state): State<AppState>,
	Json(request): Json<RestoreBackupRequest>,
) -> Result<Json<AckResponse>, ServerError> {
	state
		.service
		.restore_backup(&request.id, request.backup_type)
		.await?;
	Ok(Json(AckResponse { success: true }))
}

#[derive(Debug, Deserialize)]
pub struct DeleteBackupRequest {
	pub id: String,
}

/// POST /api/backup/delete
#[instrument(skip(state), fields(id = %request.id))]
pub async fn delete_backup(
	State(state): State<AppState>,
	Json(request): Json<DeleteBackupRequest>,
) -> Result<Json<AckResponse>, ServerError> {
	if !state.service.delete_backup(&request.id).await? {
		return Err(BackupError::ArtifactNotFound(request.id).into());
	}
	Ok(Json(AckResponse { success: true }))
}

#[derive(Debug, Serialize)]
pub struct JobsResponse {
	pub success: bool,
	pub jobs: Vec<BackupJob>,
}

/// GET /api/backup/jobs
pub async fn list_jobs(State(state): State<AppState>) -> Json<JobsResponse> {
	let jobs = state.service.list_jobs().await;
	Json(JobsResponse {
		success: true,
		jobs,
	})
}

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
	pub name: String,
	pub backup_type: BackupType,
	pub period: SchedulePeriod,
	#[serde(default)]
	pub cron_expression: String,
	pub retention_days: Option<u32>,
	#[serde(default)]
	pub offsite: bool,
	pub enabled: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
	pub success: bool,
	pub job: BackupJob,
}

/// POST /api/backup/jobs
#[instrument(skip(state, request), fields(name = %request.name))]
pub async fn create_job(
	State(state): State<AppState>,
	Json(request): Json<CreateJobRequest>,
) -> Result<Json<JobResponse>, ServerError> {
	let retention_days = request
		.retention_days
		.unwrap_or_else(|| state.service.default_retention_days());

	let mut job = BackupJob::new(
		request.name,
		request.backup_type,
		request.period,
		request.cron_expression,
		retention_days,
	);
	job.offsite = request.offsite;
	if let Some(enabled) = request.enabled {
		job.enabled = enabled;
	}

	let id = state.service.add_job(job).await?;
	let job = state
		.service
		.get_job(id)
		.await
		.ok_or(BackupError::JobNotFound(id))?;
	Ok(Json(JobResponse {
		success: true,
		job,
	}))
}

/// PATCH /api/backup/jobs/{id}
#[instrument(skip(state, update))]
pub async fn update_job(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(update): Json<JobUpdate>,
) -> Result<Json<JobResponse>, ServerError> {
	let id = parse_job_id(&id)?;
	if !state.service.update_job(id, update).await? {
		return Err(BackupError::JobNotFound(id).into());
	}
	let job = state
		.service
		.get_job(id)
		.await
		.ok_or(BackupError::JobNotFound(id))?;
	Ok(Json(JobResponse {
		success: true,
		job,
	}))
}

/// DELETE /api/backup/jobs/{id}
#[instrument(skip(state))]
pub async fn delete_job(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<AckResponse>, ServerError> {
	let id = parse_job_id(&id)?;
	if !state.service.remove_job(id).await? {
		return Err(BackupError::JobNotFound(id).into());
	}
	Ok(Json(AckResponse { success: true }))
}

/// POST /api/backup/jobs/{id}/toggle
#[instrument(skip(state))]
pub async fn toggle_job(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<JobResponse>, ServerError> {
	let id = parse_job_id(&id)?;
	if !state.service.toggle_job(id).await? {
		return Err(BackupError::JobNotFound(id).into());
	}
	let job = state
		.service
		.get_job(id)
		.await
		.ok_or(BackupError::JobNotFound(id))?;
	Ok(Json(JobResponse {
		success: true,
		job,
	}))
}

#[derive(Debug, Serialize)]
pub struct RunJobResponse {
	pub success: bool,
	pub outcome: &'static str,
	pub file: Option<String>,
}

/// POST /api/backup/jobs/{id}/run
#[instrument(skip(state))]
pub async fn run_job(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<RunJobResponse>, ServerError> {
	let id = parse_job_id(&id)?;
	let response = match state.service.run_job(id).await? {
		ExecutionOutcome::Completed { artifact } => RunJobResponse {
			success: true,
			outcome: "completed",
			file: artifact
				.file_name()
				.map(|n| n.to_string_lossy().into_owned()),
		},
		ExecutionOutcome::SkippedOverlap => RunJobResponse {
			success: true,
			outcome: "skipped_overlap",
			file: None,
		},
	};
	Ok(Json(response))
}
