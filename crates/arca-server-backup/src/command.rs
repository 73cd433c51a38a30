// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Backup and restore command construction.
//!
//! The builder translates `(backup type, run timestamp)` into a [`CommandPlan`]
//! without deciding when it runs. Metadata-only types (settings, stats) and
//! credential-less database backups are written directly and need no command;
//! missing optional configuration degrades to clearly-labelled placeholder
//! artifacts and a warning, never an error.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use arca_backup_core::BackupType;

use crate::config::BackupConfig;
use crate::error::{BackupError, Result};
use crate::runner::CommandRunner;

/// Placeholder written when no database password is configured.
const PLACEHOLDER_SQL: &str = "\
-- Arca placeholder schema export.
-- No database password is configured; a real dump was not taken.
CREATE TABLE IF NOT EXISTS backup_placeholder (
	id INTEGER PRIMARY KEY,
	note TEXT NOT NULL
);
INSERT INTO backup_placeholder (id, note)
VALUES (1, 'configure a database password to capture real dumps');
";

/// A built, not-yet-executed unit of backup work.
#[derive(Debug, Clone)]
pub enum CommandPlan {
	/// A shell command producing `artifact`. `staging` is a scratch directory
	/// to remove after a successful run.
	Shell {
		command: String,
		artifact: PathBuf,
		staging: Option<PathBuf>,
	},
	/// The artifact was written directly; nothing to execute.
	Written { artifact: PathBuf },
}

impl CommandPlan {
	pub fn artifact(&self) -> &Path {
		match self {
			Self::Shell { artifact, .. } => artifact,
			Self::Written { artifact } => artifact,
		}
	}
}

/// Single-quote `value` for `sh -c`, escaping embedded quotes so
/// operator-supplied credentials cannot break out of the token.
fn sh_quote(value: &str) -> String {
	format!("'{}'", value.replace('\'', r"'\''"))
}

/// Builds type-specific backup and restore commands against the backup root.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
	config: BackupConfig,
}

impl CommandBuilder {
	pub fn new(config: BackupConfig) -> Self {
		Self { config }
	}

	/// Build the plan for a backup of `backup_type` taken at `at`.
	///
	/// Full backups stage their sub-artifacts eagerly, which needs `runner`
	/// to take the database dump; the other types ignore it.
	pub async fn build(
		&self,
		backup_type: BackupType,
		at: DateTime<Utc>,
		runner: &dyn CommandRunner,
		timeout: Duration,
	) -> Result<CommandPlan> {
		tokio::fs::create_dir_all(&self.config.root).await?;

		match backup_type {
			BackupType::Full => self.build_full(at, runner, timeout).await,
			BackupType::Database => self.build_database(&self.config.root, at, runner, timeout).await,
			BackupType::Settings => self.build_settings(&self.config.root, at).await,
			BackupType::Stats => self.build_stats(&self.config.root, at).await,
		}
	}

	/// Database dump into `dir`. Degrades to a placeholder schema export when
	/// no password is configured.
	async fn build_database(
		&self,
		dir: &Path,
		at: DateTime<Utc>,
		_runner: &dyn CommandRunner,
		_timeout: Duration,
	) -> Result<CommandPlan> {
		let artifact = dir.join(BackupType::Database.artifact_file_name(at));

		let dump = &self.config.dump;
		match &dump.password {
			Some(password) => {
				let command = format!(
					"mysqldump -h {} -P {} -u {} -p{} {} > '{}'",
					sh_quote(&dump.host),
					dump.port,
					sh_quote(&dump.user),
					sh_quote(password),
					sh_quote(&dump.name),
					artifact.display()
				);
				Ok(CommandPlan::Shell {
					command,
					artifact,
					staging: None,
				})
			}
			None => {
				warn!(
					artifact = %artifact.display(),
					"no database password configured, writing placeholder schema export"
				);
				tokio::fs::write(&artifact, PLACEHOLDER_SQL).await?;
				Ok(CommandPlan::Written { artifact })
			}
		}
	}

	/// JSON snapshot of non-secret configuration.
	async fn build_settings(&self, dir: &Path, at: DateTime<Utc>) -> Result<CommandPlan> {
		let artifact = dir.join(BackupType::Settings.artifact_file_name(at));
		let snapshot = serde_json::to_vec_pretty(&self.config.settings_snapshot())?;
		tokio::fs::write(&artifact, snapshot).await?;
		Ok(CommandPlan::Written { artifact })
	}

	/// Placeholder analytics export; real stats live in the backend service.
	async fn build_stats(&self, dir: &Path, at: DateTime<Utc>) -> Result<CommandPlan> {
		let artifact = dir.join(BackupType::Stats.artifact_file_name(at));
		let content = format!(
			"metric,value\nexported_at,{}\ncustomers,0\norders,0\nrevenue,0.00\n",
			at.to_rfc3339()
		);
		tokio::fs::write(&artifact, content).await?;
		Ok(CommandPlan::Written { artifact })
	}

	/// Stage database, settings and stats artifacts into a scratch directory
	/// and return the command that archives it.
	async fn build_full(
		&self,
		at: DateTime<Utc>,
		runner: &dyn CommandRunner,
		timeout: Duration,
	) -> Result<CommandPlan> {
		let stem = BackupType::Full.artifact_stem(at);
		let staging = self.config.root.join(&stem);
		tokio::fs::create_dir_all(&staging).await?;

		// The database sub-artifact may need its dump command run now so the
		// archive captures actual content; settings and stats write directly.
		let database = self.build_database(&staging, at, runner, timeout).await?;
		if let CommandPlan::Shell { command, .. } = &database {
			runner.run(command, timeout).await?;
		}
		self.build_settings(&staging, at).await?;
		self.build_stats(&staging, at).await?;

		let artifact = self.config.root.join(format!("{stem}.tar.gz"));
		let command = format!(
			"tar -czf '{}' -C '{}' .",
			artifact.display(),
			staging.display()
		);

		Ok(CommandPlan::Shell {
			command,
			artifact,
			staging: Some(staging),
		})
	}

	/// Build the inverse command for restoring `artifact`.
	///
	/// Settings and stats restoration is pending backend support and is
	/// reported as unsupported rather than silently succeeding.
	pub fn restore_command(
		&self,
		backup_type: BackupType,
		artifact: &Path,
		target_dir: &Path,
	) -> Result<String> {
		match backup_type {
			BackupType::Full => Ok(format!(
				"tar -xzf '{}' -C '{}'",
				artifact.display(),
				target_dir.display()
			)),
			BackupType::Database => {
				let dump = &self.config.dump;
				let password = dump.password.as_ref().ok_or_else(|| {
					BackupError::NotConfigured(
						"database password required to restore a dump".to_string(),
					)
				})?;
				Ok(format!(
					"mysql -h {} -P {} -u {} -p{} {} < '{}'",
					sh_quote(&dump.host),
					dump.port,
					sh_quote(&dump.user),
					sh_quote(password),
					sh_quote(&dump.name),
					artifact.display()
				))
			}
			BackupType::Settings | BackupType::Stats => {
				Err(BackupError::RestoreUnsupported(backup_type))
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::runner::ShellCommandRunner;
	use chrono::TimeZone;

	const TIMEOUT: Duration = Duration::from_secs(5);

	fn config_in(root: &Path) -> BackupConfig {
		BackupConfig {
			root: root.to_path_buf(),
			..BackupConfig::default()
		}
	}

	fn at() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2026, 2, 1, 3, 0, 0).unwrap()
	}

	#[tokio::test]
	async fn test_database_with_password_builds_dump_command() {
		let dir = tempfile::tempdir().unwrap();
		let mut config = config_in(dir.path());
		config.dump.password = Some("hunter2".to_string());
		let builder = CommandBuilder::new(config);

		let plan = builder
			.build(BackupType::Database, at(), &ShellCommandRunner, TIMEOUT)
			.await
			.unwrap();

		match plan {
			CommandPlan::Shell { command, artifact, staging } => {
				assert!(command.starts_with("mysqldump"));
				assert!(command.contains("hunter2"));
				assert!(artifact.ends_with("database_backup_2026-02-01T03-00-00.sql"));
				assert!(staging.is_none());
			}
			plan => panic!("expected shell plan, got: {plan:?}"),
		}
	}

	#[tokio::test]
	async fn test_dump_credentials_with_quotes_stay_inside_their_token() {
		let dir = tempfile::tempdir().unwrap();
		let mut config = config_in(dir.path());
		config.dump.password = Some("pa'ss; rm -rf /".to_string());
		config.dump.name = "shop'db".to_string();
		let builder = CommandBuilder::new(config);

		let plan = builder
			.build(BackupType::Database, at(), &ShellCommandRunner, TIMEOUT)
			.await
			.unwrap();

		match plan {
			CommandPlan::Shell { command, .. } => {
				assert!(command.contains(r"-p'pa'\''ss; rm -rf /'"));
				assert!(command.contains(r"'shop'\''db'"));
			}
			plan => panic!("expected shell plan, got: {plan:?}"),
		}
	}

	#[test]
	fn test_sh_quote() {
		assert_eq!(sh_quote("plain"), "'plain'");
		assert_eq!(sh_quote("pa'ss"), r"'pa'\''ss'");
	}

	#[tokio::test]
	async fn test_database_without_password_writes_placeholder() {
		let dir = tempfile::tempdir().unwrap();
		let builder = CommandBuilder::new(config_in(dir.path()));

		let plan = builder
			.build(BackupType::Database, at(), &ShellCommandRunner, TIMEOUT)
			.await
			.unwrap();

		let artifact = plan.artifact().to_path_buf();
		assert!(matches!(plan, CommandPlan::Written { .. }));
		let content = tokio::fs::read_to_string(&artifact).await.unwrap();
		assert!(content.contains("placeholder schema export"));
		assert!(content.contains("CREATE TABLE"));
	}

	#[tokio::test]
	async fn test_settings_snapshot_has_no_password() {
		let dir = tempfile::tempdir().unwrap();
		let mut config = config_in(dir.path());
		config.dump.password = Some("hunter2".to_string());
		let builder = CommandBuilder::new(config);

		let plan = builder
			.build(BackupType::Settings, at(), &ShellCommandRunner, TIMEOUT)
			.await
			.unwrap();

		let content = tokio::fs::read_to_string(plan.artifact()).await.unwrap();
		assert!(content.contains("backup_root"));
		assert!(!content.contains("hunter2"));
	}

	#[tokio::test]
	async fn test_full_stages_sub_artifacts() {
		let dir = tempfile::tempdir().unwrap();
		let builder = CommandBuilder::new(config_in(dir.path()));

		let plan = builder
			.build(BackupType::Full, at(), &ShellCommandRunner, TIMEOUT)
			.await
			.unwrap();

		match &plan {
			CommandPlan::Shell { command, artifact, staging } => {
				assert!(command.starts_with("tar -czf"));
				assert!(artifact.ends_with("full_backup_2026-02-01T03-00-00.tar.gz"));

				let staging = staging.as_ref().unwrap();
				assert!(staging
					.join("database_backup_2026-02-01T03-00-00.sql")
					.exists());
				assert!(staging
					.join("settings_backup_2026-02-01T03-00-00.json")
					.exists());
				assert!(staging.join("stats_backup_2026-02-01T03-00-00.csv").exists());
			}
			plan => panic!("expected shell plan, got: {plan:?}"),
		}
	}

	#[tokio::test]
	async fn test_restore_commands() {
		let dir = tempfile::tempdir().unwrap();
		let mut config = config_in(dir.path());
		let builder = CommandBuilder::new(config.clone());

		let artifact = dir.path().join("full_backup_2026-02-01T03-00-00.tar.gz");
		let target = dir.path().join("restore");

		let command = builder
			.restore_command(BackupType::Full, &artifact, &target)
			.unwrap();
		assert!(command.starts_with("tar -xzf"));

		// No password: database restore is a descriptive error, not a guess.
		let err = builder
			.restore_command(BackupType::Database, &artifact, &target)
			.unwrap_err();
		assert!(matches!(err, BackupError::NotConfigured(_)));

		config.dump.password = Some("hunter2".to_string());
		let builder = CommandBuilder::new(config);
		let command = builder
			.restore_command(BackupType::Database, &artifact, &target)
			.unwrap();
		assert!(command.starts_with("mysql"));

		let err = builder
			.restore_command(BackupType::Settings, &artifact, &target)
			.unwrap_err();
		assert!(matches!(err, BackupError::RestoreUnsupported(BackupType::Settings)));
	}
}
