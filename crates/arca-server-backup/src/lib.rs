// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Backup scheduling and execution for the Arca server.
//!
//! The crate is wired together through [`BackupService`]: jobs are persisted
//! via a [`JobStore`], cached in memory, and fired by the [`Scheduler`]
//! through the [`Executor`] pipeline. Side effects are injected as
//! capabilities ([`CommandRunner`], [`OffsiteUploader`]) so tests and
//! restricted deployments can substitute them.

pub mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod registry;
pub mod repository;
pub mod retention;
pub mod runner;
pub mod scheduler;
pub mod uploader;

pub use command::{CommandBuilder, CommandPlan};
pub use config::{BackupConfig, DumpConfig, SettingsSnapshot};
pub use error::{BackupError, Result};
pub use executor::{ExecutionOutcome, Executor};
pub use registry::{ArtifactInfo, BackupService, JobUpdate, SchedulerStatus};
pub use repository::{run_migrations, JobStore, SqliteJobStore};
pub use retention::cleanup_expired;
pub use runner::{CommandRunner, ShellCommandRunner};
pub use scheduler::Scheduler;
pub use uploader::{LocalMirrorUploader, NoopUploader, OffsiteUploader};
