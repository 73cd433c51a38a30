// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Health check HTTP handler.

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;

use crate::api::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: &'static str,
	pub timestamp: String,
	pub version: &'static str,
	pub jobs: usize,
	pub scheduled: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let status = state.service.status().await;

	Json(HealthResponse {
		status: "ok",
		timestamp: chrono::Utc::now().to_rfc3339(),
		version: env!("CARGO_PKG_VERSION"),
		jobs: status.jobs,
		scheduled: status.scheduled.len(),
	})
}
