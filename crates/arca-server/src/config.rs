// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered server configuration.
//!
//! Precedence (highest to lowest):
//! 1. Environment variables (`ARCA_SERVER_*`)
//! 2. Config file (`/etc/arca/server.toml`)
//! 3. Built-in defaults

use std::path::PathBuf;

use arca_server_backup::{BackupConfig, DumpConfig};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config file {path}: {source}")]
	FileRead {
		path: PathBuf,
		source: std::io::Error,
	},

	#[error("failed to parse config file {path}: {source}")]
	TomlParse {
		path: PathBuf,
		source: toml::de::Error,
	},

	#[error("invalid value for {key}: {message}")]
	InvalidValue { key: String, message: String },
}

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub database: DatabaseConfig,
	pub backup: BackupConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
	pub host: String,
	pub port: u16,
}

impl Default for HttpConfig {
	fn default() -> Self {
		Self {
			host: "0.0.0.0".to_string(),
			port: 8080,
		}
	}
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
	pub url: String,
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		Self {
			url: "sqlite:./arca.db".to_string(),
		}
	}
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
	pub level: String,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
		}
	}
}

/// Partial configuration for merging; every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub backup: Option<BackupConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl ServerConfigLayer {
	pub fn merge(&mut self, other: Self) {
		merge_section(&mut self.http, other.http, HttpConfigLayer::merge);
		merge_section(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_section(&mut self.backup, other.backup, BackupConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: fn(&mut T, T)) {
	match (base.as_mut(), other) {
		(Some(base), Some(other)) => merge(base, other),
		(None, Some(other)) => *base = Some(other),
		_ => {}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpConfigLayer {
	#[serde(default)]
	pub host: Option<String>,
	#[serde(default)]
	pub port: Option<u16>,
}

impl HttpConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.host.is_some() {
			self.host = other.host;
		}
		if other.port.is_some() {
			self.port = other.port;
		}
	}

	pub fn finalize(self) -> HttpConfig {
		let defaults = HttpConfig::default();
		HttpConfig {
			host: self.host.unwrap_or(defaults.host),
			port: self.port.unwrap_or(defaults.port),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfigLayer {
	#[serde(default)]
	pub url: Option<String>,
}

impl DatabaseConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.url.is_some() {
			self.url = other.url;
		}
	}

	pub fn finalize(self) -> DatabaseConfig {
		DatabaseConfig {
			url: self.url.unwrap_or_else(|| DatabaseConfig::default().url),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfigLayer {
	#[serde(default)]
	pub level: Option<String>,
}

impl LoggingConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.level.is_some() {
			self.level = other.level;
		}
	}

	pub fn finalize(self) -> LoggingConfig {
		LoggingConfig {
			level: self.level.unwrap_or_else(|| LoggingConfig::default().level),
		}
	}
}

/// Backup section; finalizes into the backup crate's [`BackupConfig`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackupConfigLayer {
	#[serde(default)]
	pub root: Option<PathBuf>,
	#[serde(default)]
	pub retention_days: Option<u32>,
	#[serde(default)]
	pub command_timeout_secs: Option<u64>,
	#[serde(default)]
	pub mirror_dir: Option<PathBuf>,
	#[serde(default)]
	pub db_host: Option<String>,
	#[serde(default)]
	pub db_port: Option<u16>,
	#[serde(default)]
	pub db_user: Option<String>,
	#[serde(default)]
	pub db_password: Option<String>,
	#[serde(default)]
	pub db_name: Option<String>,
}

impl BackupConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.root.is_some() {
			self.root = other.root;
		}
		if other.retention_days.is_some() {
			self.retention_days = other.retention_days;
		}
		if other.command_timeout_secs.is_some() {
			self.command_timeout_secs = other.command_timeout_secs;
		}
		if other.mirror_dir.is_some() {
			self.mirror_dir = other.mirror_dir;
		}
		if other.db_host.is_some() {
			self.db_host = other.db_host;
		}
		if other.db_port.is_some() {
			self.db_port = other.db_port;
		}
		if other.db_user.is_some() {
			self.db_user = other.db_user;
		}
		if other.db_password.is_some() {
			self.db_password = other.db_password;
		}
		if other.db_name.is_some() {
			self.db_name = other.db_name;
		}
	}

	pub fn finalize(self) -> BackupConfig {
		let defaults = BackupConfig::default();
		let dump_defaults = DumpConfig::default();
		BackupConfig {
			root: self.root.unwrap_or(defaults.root),
			default_retention_days: self.retention_days.unwrap_or(defaults.default_retention_days),
			command_timeout_secs: self
				.command_timeout_secs
				.unwrap_or(defaults.command_timeout_secs),
			mirror_dir: self.mirror_dir,
			dump: DumpConfig {
				host: self.db_host.unwrap_or(dump_defaults.host),
				port: self.db_port.unwrap_or(dump_defaults.port),
				user: self.db_user.unwrap_or(dump_defaults.user),
				password: self.db_password,
				name: self.db_name.unwrap_or(dump_defaults.name),
			},
		}
	}
}

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/arca/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})
	}
}

/// Environment variable source.
///
/// Convention: ARCA_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		Ok(ServerConfigLayer {
			http: Some(HttpConfigLayer {
				host: env_var("ARCA_SERVER_HOST"),
				port: env_u16("ARCA_SERVER_PORT")?,
			}),
			database: Some(DatabaseConfigLayer {
				url: env_var("ARCA_SERVER_DATABASE_URL"),
			}),
			backup: Some(BackupConfigLayer {
				root: env_var("ARCA_SERVER_BACKUP_ROOT").map(PathBuf::from),
				retention_days: env_u32("ARCA_SERVER_BACKUP_RETENTION_DAYS")?,
				command_timeout_secs: env_u64("ARCA_SERVER_BACKUP_COMMAND_TIMEOUT_SECS")?,
				mirror_dir: env_var("ARCA_SERVER_BACKUP_MIRROR_DIR").map(PathBuf::from),
				db_host: env_var("ARCA_SERVER_BACKUP_DB_HOST"),
				db_port: env_u16("ARCA_SERVER_BACKUP_DB_PORT")?,
				db_user: env_var("ARCA_SERVER_BACKUP_DB_USER"),
				db_password: env_var("ARCA_SERVER_BACKUP_DB_PASSWORD"),
				db_name: env_var("ARCA_SERVER_BACKUP_DB_NAME"),
			}),
			logging: Some(LoggingConfigLayer {
				level: env_var("ARCA_SERVER_LOG_LEVEL"),
			}),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_u16(name: &str) -> Result<Option<u16>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u16 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_u32(name: &str) -> Result<Option<u32>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u32 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u64 value '{v}'"),
		}),
		None => Ok(None),
	}
}

/// Load configuration from all sources with standard precedence.
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	Ok(ServerConfig {
		http: layer.http.unwrap_or_default().finalize(),
		database: layer.database.unwrap_or_default().finalize(),
		backup: layer.backup.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = finalize(ServerConfigLayer::default()).unwrap();
		assert_eq!(config.socket_addr(), "0.0.0.0:8080");
		assert_eq!(config.database.url, "sqlite:./arca.db");
		assert_eq!(config.backup.root, PathBuf::from("backups"));
		assert_eq!(config.backup.default_retention_days, 30);
		assert!(config.backup.dump.password.is_none());
		assert_eq!(config.logging.level, "info");
	}

	#[test]
	fn test_toml_layer_parses_partial_sections() {
		let layer: ServerConfigLayer = toml::from_str(
			r#"
[http]
port = 9090

[backup]
root = "/var/lib/arca/backups"
retention_days = 7
db_password = "hunter2"
"#,
		)
		.unwrap();

		let config = finalize(layer).unwrap();
		assert_eq!(config.http.port, 9090);
		assert_eq!(config.http.host, "0.0.0.0");
		assert_eq!(config.backup.root, PathBuf::from("/var/lib/arca/backups"));
		assert_eq!(config.backup.default_retention_days, 7);
		assert_eq!(config.backup.dump.password.as_deref(), Some("hunter2"));
		// Unset backup fields keep their defaults.
		assert_eq!(config.backup.command_timeout_secs, 600);
	}

	#[test]
	fn test_merge_overlay_wins() {
		let mut base: ServerConfigLayer = toml::from_str(
			r#"
[http]
host = "127.0.0.1"
port = 8080
"#,
		)
		.unwrap();
		let overlay: ServerConfigLayer = toml::from_str(
			r#"
[http]
port = 9000
"#,
		)
		.unwrap();

		base.merge(overlay);
		let http = base.http.unwrap();
		assert_eq!(http.host.as_deref(), Some("127.0.0.1"));
		assert_eq!(http.port, Some(9000));
	}

	#[test]
	fn test_missing_config_file_is_skipped() {
		let layer = TomlSource::new("/nonexistent/arca-server.toml")
			.load()
			.unwrap();
		assert!(layer.http.is_none());
	}

	#[test]
	fn test_invalid_toml_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("server.toml");
		std::fs::write(&path, "[http\nport = 9090").unwrap();

		let result = TomlSource::new(&path).load();
		assert!(matches!(result, Err(ConfigError::TomlParse { .. })));
	}
}
