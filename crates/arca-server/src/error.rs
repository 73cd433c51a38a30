// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! HTTP error mapping for the backup API.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::Serialize;
use thiserror::Error;

use arca_server_backup::BackupError;

/// Error response body shared by all API endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub success: bool,
	pub error: String,
	pub message: String,
}

#[derive(Debug, Error)]
pub enum ServerError {
	#[error(transparent)]
	Backup(#[from] BackupError),

	#[error("bad request: {0}")]
	BadRequest(String),
}

impl ServerError {
	fn status_and_code(&self) -> (StatusCode, &'static str) {
		match self {
			ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
			ServerError::Backup(e) => match e {
				BackupError::JobNotFound(_) => (StatusCode::NOT_FOUND, "job_not_found"),
				BackupError::ArtifactNotFound(_) => (StatusCode::NOT_FOUND, "artifact_not_found"),
				BackupError::Core(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
				BackupError::NotConfigured(_) => (StatusCode::BAD_REQUEST, "not_configured"),
				BackupError::RestoreUnsupported(_) => {
					(StatusCode::NOT_IMPLEMENTED, "restore_unsupported")
				}
				BackupError::CommandTimeout(_) => (StatusCode::INTERNAL_SERVER_ERROR, "timeout"),
				_ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
			},
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let (status, code) = self.status_and_code();
		if status.is_server_error() {
			tracing::error!(error = %self, "request failed");
		}
		let body = ErrorResponse {
			success: false,
			error: code.to_string(),
			message: self.to_string(),
		};
		(status, Json(body)).into_response()
	}
}
