// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Off-site upload capability.
//!
//! Artifacts of jobs with `offsite` set are mirrored through the
//! [`OffsiteUploader`] trait. When no provider is configured the
//! [`NoopUploader`] is substituted, so the backup pipeline never has to check
//! for availability. Upload failures never fail a run; backup success is
//! defined by the local artifact.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{BackupError, Result};

/// Mirrors named artifacts to a remote folder.
#[async_trait]
pub trait OffsiteUploader: Send + Sync {
	async fn upload(&self, artifact: &Path) -> Result<()>;
	async fn delete(&self, file_name: &str) -> Result<()>;
}

/// Substituted when no off-site provider is configured: logs and skips.
#[derive(Debug, Clone, Default)]
pub struct NoopUploader;

#[async_trait]
impl OffsiteUploader for NoopUploader {
	async fn upload(&self, artifact: &Path) -> Result<()> {
		debug!(artifact = %artifact.display(), "no off-site provider configured, skipping upload");
		Ok(())
	}

	async fn delete(&self, file_name: &str) -> Result<()> {
		debug!(file_name, "no off-site provider configured, skipping delete");
		Ok(())
	}
}

/// Mirrors artifacts into a second directory (e.g. a mounted remote share).
#[derive(Debug, Clone)]
pub struct LocalMirrorUploader {
	mirror_dir: PathBuf,
}

impl LocalMirrorUploader {
	pub fn new(mirror_dir: impl Into<PathBuf>) -> Self {
		Self {
			mirror_dir: mirror_dir.into(),
		}
	}
}

#[async_trait]
impl OffsiteUploader for LocalMirrorUploader {
	async fn upload(&self, artifact: &Path) -> Result<()> {
		let file_name = artifact
			.file_name()
			.ok_or_else(|| BackupError::Internal(format!("no file name: {}", artifact.display())))?;

		tokio::fs::create_dir_all(&self.mirror_dir).await?;
		let target = self.mirror_dir.join(file_name);
		tokio::fs::copy(artifact, &target).await?;

		info!(artifact = %artifact.display(), target = %target.display(), "mirrored artifact off-site");
		Ok(())
	}

	async fn delete(&self, file_name: &str) -> Result<()> {
		let target = self.mirror_dir.join(file_name);
		match tokio::fs::remove_file(&target).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e.into()),
		}
	}
}
