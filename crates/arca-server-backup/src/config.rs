// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Backup service configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Resolved configuration for the backup service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupConfig {
	/// Directory all artifacts are written under.
	pub root: PathBuf,
	/// Retention applied to jobs that don't specify their own.
	pub default_retention_days: u32,
	/// Hard timeout for any spawned backup/restore command.
	pub command_timeout_secs: u64,
	/// Off-site mirror directory. `None` disables off-site upload.
	pub mirror_dir: Option<PathBuf>,
	/// Credentials for database dump/restore commands.
	pub dump: DumpConfig,
}

/// Connection settings handed to the external dump/restore tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DumpConfig {
	pub host: String,
	pub port: u16,
	pub user: String,
	/// Without a password the builder degrades to placeholder artifacts.
	pub password: Option<String>,
	pub name: String,
}

impl Default for BackupConfig {
	fn default() -> Self {
		Self {
			root: PathBuf::from("backups"),
			default_retention_days: 30,
			command_timeout_secs: 600,
			mirror_dir: None,
			dump: DumpConfig::default(),
		}
	}
}

impl Default for DumpConfig {
	fn default() -> Self {
		Self {
			host: "localhost".to_string(),
			port: 3306,
			user: "root".to_string(),
			password: None,
			name: "arca".to_string(),
		}
	}
}

impl BackupConfig {
	pub fn command_timeout(&self) -> Duration {
		Duration::from_secs(self.command_timeout_secs)
	}

	/// Snapshot of non-secret configuration for settings backups.
	///
	/// The dump password is excluded by construction; artifacts of this
	/// snapshot are safe to mirror off-site.
	pub fn settings_snapshot(&self) -> SettingsSnapshot {
		SettingsSnapshot {
			backup_root: self.root.display().to_string(),
			default_retention_days: self.default_retention_days,
			command_timeout_secs: self.command_timeout_secs,
			mirror_dir: self.mirror_dir.as_ref().map(|p| p.display().to_string()),
			database: DumpSnapshot {
				host: self.dump.host.clone(),
				port: self.dump.port,
				user: self.dump.user.clone(),
				name: self.dump.name.clone(),
			},
		}
	}
}

/// Non-secret configuration captured by settings backups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsSnapshot {
	pub backup_root: String,
	pub default_retention_days: u32,
	pub command_timeout_secs: u64,
	pub mirror_dir: Option<String>,
	pub database: DumpSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpSnapshot {
	pub host: String,
	pub port: u16,
	pub user: String,
	pub name: String,
}
