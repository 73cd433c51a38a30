// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for backup core operations.

use thiserror::Error;

/// Result type for backup core operations.
pub type Result<T> = std::result::Result<T, BackupCoreError>;

/// Errors that can occur while working with backup job definitions.
#[derive(Debug, Error)]
pub enum BackupCoreError {
	#[error("invalid cron expression: {0}")]
	InvalidCronExpression(String),

	#[error("unknown backup type: {0}")]
	UnknownBackupType(String),

	#[error("unknown job status: {0}")]
	UnknownJobStatus(String),

	#[error("unknown schedule period: {0}")]
	UnknownSchedulePeriod(String),

	#[error("internal error: {0}")]
	Internal(String),
}
