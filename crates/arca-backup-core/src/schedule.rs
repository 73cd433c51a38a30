// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cron expression validation and next-run calculation.

use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;

use crate::error::{BackupCoreError, Result};

/// Convert a standard 5-field Unix cron expression to the 7-field format
/// expected by the `cron` crate.
///
/// 5-field format: minute hour day-of-month month day-of-week
/// 7-field format: second minute hour day-of-month month day-of-week year
///
/// We add "0" for seconds (fire at :00 of the minute) and "*" for year.
fn to_cron_crate_format(expression: &str) -> String {
	let field_count = expression.split_whitespace().count();
	if field_count == 5 {
		format!("0 {} *", expression)
	} else {
		// 6/7-field expressions pass through; anything else is left for the
		// parser to reject.
		expression.to_string()
	}
}

/// Parse a cron expression, rejecting invalid ones with a descriptive error.
fn parse(expression: &str) -> Result<Schedule> {
	Schedule::from_str(&to_cron_crate_format(expression))
		.map_err(|e| BackupCoreError::InvalidCronExpression(format!("{expression}: {e}")))
}

/// Validate a cron expression without computing an occurrence.
pub fn validate_cron_expression(expression: &str) -> Result<()> {
	parse(expression).map(|_| ())
}

/// Compute the next occurrence of `expression` strictly after `after`, in UTC.
pub fn next_occurrence(expression: &str, after: DateTime<Utc>) -> Result<DateTime<Utc>> {
	let schedule = parse(expression)?;
	schedule.after(&after).next().ok_or_else(|| {
		BackupCoreError::Internal(format!("no next occurrence for cron expression {expression}"))
	})
}
