// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Application state and router assembly.

use std::sync::Arc;

use axum::{
	routing::{delete, get, patch, post},
	Router,
};

use arca_server_backup::BackupService;

use crate::routes;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<BackupService>,
}

pub fn create_router(state: AppState) -> Router {
	let backup = Router::new()
		.route("/files", get(routes::backup::list_files))
		.route("/status", get(routes::backup::scheduler_status))
		.route("/create", post(routes::backup::create_backup))
		.route("/restore", post(routes::backup::restore_backup))
		.route("/delete", post(routes::backup::delete_backup))
		.route("/jobs", get(routes::backup::list_jobs))
		.route("/jobs", post(routes::backup::create_job))
		.route("/jobs/{id}", patch(routes::backup::update_job))
		.route("/jobs/{id}", delete(routes::backup::delete_job))
		.route("/jobs/{id}/toggle", post(routes::backup::toggle_job))
		.route("/jobs/{id}/run", post(routes::backup::run_job));

	Router::new()
		.route("/health", get(routes::health::health_check))
		.nest("/api/backup", backup)
		.with_state(state)
}
