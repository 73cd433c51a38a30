// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Retention cleanup for backup artifacts.

use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use tracing::{info, warn};

use arca_backup_core::BackupType;

use crate::error::Result;

/// Delete artifacts of `backup_type` under `root` that are older than
/// `retention_days` as of `now`. Returns the number of entries deleted.
///
/// Only entries whose filename carries the type's tag are considered; other
/// types' artifacts are never touched regardless of age. Per-entry failures
/// are logged and skipped so one bad file doesn't abort the pass.
pub async fn cleanup_expired(
	root: &Path,
	backup_type: BackupType,
	retention_days: u32,
	now: DateTime<Utc>,
) -> Result<u32> {
	let cutoff = now - Duration::days(i64::from(retention_days));
	let mut deleted = 0u32;

	let mut entries = tokio::fs::read_dir(root).await?;
	while let Some(entry) = entries.next_entry().await? {
		let name = entry.file_name().to_string_lossy().into_owned();
		if !backup_type.matches_artifact(&name) {
			continue;
		}

		let metadata = match entry.metadata().await {
			Ok(m) => m,
			Err(e) => {
				warn!(artifact = %name, error = %e, "could not stat artifact, skipping");
				continue;
			}
		};
		let modified: DateTime<Utc> = match metadata.modified() {
			Ok(t) => t.into(),
			Err(e) => {
				warn!(artifact = %name, error = %e, "no modification time, skipping");
				continue;
			}
		};
		if modified >= cutoff {
			continue;
		}

		// Stale full-backup staging directories carry the type tag too.
		let result = if metadata.is_dir() {
			tokio::fs::remove_dir_all(entry.path()).await
		} else {
			tokio::fs::remove_file(entry.path()).await
		};
		match result {
			Ok(()) => {
				info!(artifact = %name, "deleted expired artifact");
				deleted += 1;
			}
			Err(e) => warn!(artifact = %name, error = %e, "failed to delete expired artifact"),
		}
	}

	Ok(deleted)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_cleanup_only_touches_matching_type() {
		let dir = tempfile::tempdir().unwrap();
		let database = dir.path().join("database_backup_2026-01-01T00-00-00.sql");
		let settings = dir.path().join("settings_backup_2026-01-01T00-00-00.json");
		tokio::fs::write(&database, b"-- dump").await.unwrap();
		tokio::fs::write(&settings, b"{}").await.unwrap();

		// Both files are "old" relative to this cutoff, but only the job's
		// own type may be deleted.
		let future = Utc::now() + Duration::days(3);
		let deleted = cleanup_expired(dir.path(), BackupType::Database, 1, future)
			.await
			.unwrap();

		assert_eq!(deleted, 1);
		assert!(!database.exists());
		assert!(settings.exists());
	}

	#[tokio::test]
	async fn test_fresh_artifacts_survive() {
		let dir = tempfile::tempdir().unwrap();
		let database = dir.path().join("database_backup_2026-01-01T00-00-00.sql");
		tokio::fs::write(&database, b"-- dump").await.unwrap();

		let deleted = cleanup_expired(dir.path(), BackupType::Database, 1, Utc::now())
			.await
			.unwrap();

		assert_eq!(deleted, 0);
		assert!(database.exists());
	}

	#[tokio::test]
	async fn test_cleanup_removes_stale_staging_dirs() {
		let dir = tempfile::tempdir().unwrap();
		let staging = dir.path().join("full_backup_2026-01-01T00-00-00");
		tokio::fs::create_dir_all(&staging).await.unwrap();
		tokio::fs::write(staging.join("x.sql"), b"-- dump")
			.await
			.unwrap();

		let future = Utc::now() + Duration::days(3);
		let deleted = cleanup_expired(dir.path(), BackupType::Full, 1, future)
			.await
			.unwrap();

		assert_eq!(deleted, 1);
		assert!(!staging.exists());
	}
}
