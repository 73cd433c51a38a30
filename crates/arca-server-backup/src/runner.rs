// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Command execution capability.
//!
//! Backup and restore work is expressed as shell command strings (dump tools,
//! tar) and executed through the [`CommandRunner`] trait so tests can inject
//! fakes. The production [`ShellCommandRunner`] enforces a hard timeout and
//! kills the child on expiry rather than leaving it orphaned.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{BackupError, Result};

/// Runs a shell command to completion within a timeout.
#[async_trait]
pub trait CommandRunner: Send + Sync {
	async fn run(&self, command: &str, timeout: Duration) -> Result<()>;
}

/// Spawns commands via `sh -c`.
#[derive(Debug, Clone, Default)]
pub struct ShellCommandRunner;

#[async_trait]
impl CommandRunner for ShellCommandRunner {
	async fn run(&self, command: &str, timeout: Duration) -> Result<()> {
		debug!(%command, "running backup command");

		let mut child = Command::new("sh")
			.arg("-c")
			.arg(command)
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.stderr(Stdio::piped())
			.spawn()?;

		let mut stderr = child.stderr.take();

		tokio::select! {
			status = child.wait() => {
				let status = status?;
				if status.success() {
					return Ok(());
				}

				let mut message = String::new();
				if let Some(ref mut pipe) = stderr {
					pipe.read_to_string(&mut message).await.ok();
				}
				let message = message.trim();
				if message.is_empty() {
					Err(BackupError::CommandFailed(format!("exited with {status}")))
				} else {
					Err(BackupError::CommandFailed(message.to_string()))
				}
			}
			_ = tokio::time::sleep(timeout) => {
				warn!(%command, timeout_secs = timeout.as_secs(), "command timed out, killing");
				child.kill().await.ok();
				Err(BackupError::CommandTimeout(timeout.as_secs()))
			}
		}
	}
}
