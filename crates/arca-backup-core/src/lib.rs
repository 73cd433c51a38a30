// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Arca backup service.
//!
//! This crate defines the backup job domain model (jobs, types, statuses,
//! artifact naming) and cron schedule evaluation. It carries no I/O; the
//! execution machinery lives in `arca-server-backup`.

pub mod error;
pub mod job;
pub mod schedule;

pub use error::{BackupCoreError, Result};
pub use job::{BackupJob, BackupType, JobId, JobStatus, SchedulePeriod};
pub use schedule::{next_occurrence, validate_cron_expression};
