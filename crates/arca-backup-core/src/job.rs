// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Backup job types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a backup job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for JobId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for JobId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for JobId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// What a backup run captures.
///
/// Each type owns its artifact filename tag and extension. Retention cleanup
/// and type inference key off the tag, so tags must never be substrings of
/// each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupType {
	/// Database + settings + stats staged and archived together.
	Full,
	Database,
	Settings,
	Stats,
}

impl BackupType {
	/// Filename tag identifying artifacts of this type.
	pub fn tag(&self) -> &'static str {
		match self {
			Self::Full => "full",
			Self::Database => "database",
			Self::Settings => "settings",
			Self::Stats => "stats",
		}
	}

	/// Artifact file extension, including the leading dot.
	pub fn extension(&self) -> &'static str {
		match self {
			Self::Full => ".tar.gz",
			Self::Database => ".sql",
			Self::Settings => ".json",
			Self::Stats => ".csv",
		}
	}

	/// Artifact name without extension for a run at `at`: `{tag}_backup_{timestamp}`.
	pub fn artifact_stem(&self, at: DateTime<Utc>) -> String {
		format!("{}_backup_{}", self.tag(), at.format("%Y-%m-%dT%H-%M-%S"))
	}

	/// Artifact filename with extension for a run at `at`.
	pub fn artifact_file_name(&self, at: DateTime<Utc>) -> String {
		format!("{}{}", self.artifact_stem(at), self.extension())
	}

	/// Whether `file_name` belongs to this backup type.
	pub fn matches_artifact(&self, file_name: &str) -> bool {
		file_name.contains(self.tag())
	}

	/// Infer the backup type of an artifact from its filename.
	pub fn infer_from_file_name(file_name: &str) -> Option<Self> {
		[Self::Full, Self::Database, Self::Settings, Self::Stats]
			.into_iter()
			.find(|t| t.matches_artifact(file_name))
	}
}

impl fmt::Display for BackupType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.tag())
	}
}

impl FromStr for BackupType {
	type Err = crate::BackupCoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"full" => Ok(Self::Full),
			"database" => Ok(Self::Database),
			"settings" => Ok(Self::Settings),
			"stats" => Ok(Self::Stats),
			_ => Err(crate::BackupCoreError::UnknownBackupType(s.to_string())),
		}
	}
}

/// Coarse cadence label. Descriptive only; actual timing comes from the
/// job's cron expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulePeriod {
	Daily,
	Weekly,
	Monthly,
	Yearly,
	Manual,
}

impl fmt::Display for SchedulePeriod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Daily => write!(f, "daily"),
			Self::Weekly => write!(f, "weekly"),
			Self::Monthly => write!(f, "monthly"),
			Self::Yearly => write!(f, "yearly"),
			Self::Manual => write!(f, "manual"),
		}
	}
}

impl FromStr for SchedulePeriod {
	type Err = crate::BackupCoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"daily" => Ok(Self::Daily),
			"weekly" => Ok(Self::Weekly),
			"monthly" => Ok(Self::Monthly),
			"yearly" => Ok(Self::Yearly),
			"manual" => Ok(Self::Manual),
			_ => Err(crate::BackupCoreError::UnknownSchedulePeriod(s.to_string())),
		}
	}
}

/// Whether a job is currently eligible for scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
	/// Eligible for a live trigger (when also enabled).
	Active,
	/// Kept in the registry, never fired.
	Paused,
	/// Last execution failed; never fired until revived.
	Error,
}

impl fmt::Display for JobStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Active => write!(f, "active"),
			Self::Paused => write!(f, "paused"),
			Self::Error => write!(f, "error"),
		}
	}
}

impl FromStr for JobStatus {
	type Err = crate::BackupCoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"active" => Ok(Self::Active),
			"paused" => Ok(Self::Paused),
			"error" => Ok(Self::Error),
			_ => Err(crate::BackupCoreError::UnknownJobStatus(s.to_string())),
		}
	}
}

/// A named, schedulable unit of backup work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupJob {
	pub id: JobId,
	/// Human-readable label: "Nightly database dump"
	pub name: String,
	pub backup_type: BackupType,
	pub period: SchedulePeriod,
	/// Five-field Unix cron expression driving the trigger. Empty only for
	/// manual-period jobs.
	pub cron_expression: String,
	pub last_run: Option<DateTime<Utc>>,
	pub next_run: Option<DateTime<Utc>>,
	pub status: JobStatus,
	/// Artifacts of this job's type older than this many days are deleted
	/// after each successful run.
	pub retention_days: u32,
	/// Mirror successful artifacts to the configured off-site provider.
	pub offsite: bool,
	/// Master on/off switch, independent of `status`.
	pub enabled: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl BackupJob {
	pub fn new(
		name: impl Into<String>,
		backup_type: BackupType,
		period: SchedulePeriod,
		cron_expression: impl Into<String>,
		retention_days: u32,
	) -> Self {
		let now = Utc::now();
		Self {
			id: JobId::new(),
			name: name.into(),
			backup_type,
			period,
			cron_expression: cron_expression.into(),
			last_run: None,
			next_run: None,
			status: JobStatus::Active,
			retention_days,
			offsite: false,
			enabled: true,
			created_at: now,
			updated_at: now,
		}
	}

	/// A job holds a live trigger iff it is enabled, active, and has a cron
	/// expression to fire on.
	pub fn is_schedulable(&self) -> bool {
		self.enabled && self.status == JobStatus::Active && !self.cron_expression.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	#[test]
	fn test_artifact_naming() {
		let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
		assert_eq!(
			BackupType::Database.artifact_file_name(at),
			"database_backup_2026-03-14T09-26-53.sql"
		);
		assert_eq!(
			BackupType::Full.artifact_file_name(at),
			"full_backup_2026-03-14T09-26-53.tar.gz"
		);
	}

	#[test]
	fn test_infer_type_from_file_name() {
		assert_eq!(
			BackupType::infer_from_file_name("database_backup_2026-03-14T09-26-53.sql"),
			Some(BackupType::Database)
		);
		assert_eq!(
			BackupType::infer_from_file_name("settings_backup_2026-03-14T09-26-53.json"),
			Some(BackupType::Settings)
		);
		assert_eq!(BackupType::infer_from_file_name("notes.txt"), None);
	}

	#[test]
	fn test_tags_are_not_substrings_of_each_other() {
		let types = [
			BackupType::Full,
			BackupType::Database,
			BackupType::Settings,
			BackupType::Stats,
		];
		for a in types {
			for b in types {
				if a != b {
					assert!(
						!a.tag().contains(b.tag()),
						"{} must not contain {}",
						a.tag(),
						b.tag()
					);
				}
			}
		}
	}

	#[test]
	fn test_backup_type_round_trip() {
		for t in [
			BackupType::Full,
			BackupType::Database,
			BackupType::Settings,
			BackupType::Stats,
		] {
			assert_eq!(t.to_string().parse::<BackupType>().unwrap(), t);
		}
		assert!("archive".parse::<BackupType>().is_err());
	}

	#[test]
	fn test_is_schedulable() {
		let mut job = BackupJob::new(
			"nightly",
			BackupType::Database,
			SchedulePeriod::Daily,
			"0 3 * * *",
			7,
		);
		assert!(job.is_schedulable());

		job.enabled = false;
		assert!(!job.is_schedulable());

		job.enabled = true;
		job.status = JobStatus::Paused;
		assert!(!job.is_schedulable());

		job.status = JobStatus::Error;
		assert!(!job.is_schedulable());

		job.status = JobStatus::Active;
		job.cron_expression.clear();
		assert!(!job.is_schedulable());
	}
}
