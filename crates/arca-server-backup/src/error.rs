// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the backup service.

use arca_backup_core::{BackupCoreError, BackupType, JobId};
use thiserror::Error;

/// Result type for backup service operations.
pub type Result<T> = std::result::Result<T, BackupError>;

/// Errors that can occur in backup service operations.
#[derive(Debug, Error)]
pub enum BackupError {
	#[error("backup job not found: {0}")]
	JobNotFound(JobId),

	#[error("backup artifact not found: {0}")]
	ArtifactNotFound(String),

	#[error("backup command failed: {0}")]
	CommandFailed(String),

	#[error("backup command timed out after {0}s")]
	CommandTimeout(u64),

	#[error("restore is not supported for {0} backups")]
	RestoreUnsupported(BackupType),

	#[error("not configured: {0}")]
	NotConfigured(String),

	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error(transparent)]
	Core(#[from] BackupCoreError),

	#[error("internal error: {0}")]
	Internal(String),
}
