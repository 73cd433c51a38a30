// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Integration tests for the backup HTTP API.

use std::sync::Arc;

use axum::{
	body::{to_bytes, Body},
	http::{header, Request, StatusCode},
	Router,
};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;
use tower::ServiceExt;

use arca_server::{create_router, AppState};
use arca_server_backup::{
	run_migrations, BackupConfig, BackupService, NoopUploader, ShellCommandRunner, SqliteJobStore,
};

async fn test_app() -> (Router, Arc<BackupService>, TempDir) {
	let dir = tempfile::tempdir().unwrap();
	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.connect("sqlite::memory:")
		.await
		.unwrap();
	run_migrations(&pool).await.unwrap();

	let config = BackupConfig {
		root: dir.path().to_path_buf(),
		..BackupConfig::default()
	};
	let service = Arc::new(BackupService::new(
		config,
		Arc::new(SqliteJobStore::new(pool)),
		Arc::new(ShellCommandRunner),
		Arc::new(NoopUploader),
	));

	let app = create_router(AppState {
		service: Arc::clone(&service),
	});
	(app, service, dir)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
	Request::builder()
		.method(method)
		.uri(uri)
		.header(header::CONTENT_TYPE, "application/json")
		.body(Body::from(serde_json::to_vec(&body).unwrap()))
		.unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
	Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
	let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
	serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
	let (app, _service, _dir) = test_app().await;

	let response = app.oneshot(get_request("/health")).await.unwrap();
	assert_eq!(response.status(), StatusCode::OK);

	let body = body_json(response).await;
	assert_eq!(body["status"], "ok");
	assert_eq!(body["jobs"], 0);
}

#[tokio::test]
async fn test_job_lifecycle_over_http() {
	let (app, service, _dir) = test_app().await;

	// Create a scheduled job.
	let response = app
		.clone()
		.oneshot(json_request(
			"POST",
			"/api/backup/jobs",
			json!({
				"name": "nightly db",
				"backup_type": "database",
				"period": "daily",
				"cron_expression": "0 3 * * *",
				"retention_days": 14
			}),
		))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	let body = body_json(response).await;
	assert_eq!(body["success"], true);
	assert_eq!(body["job"]["status"], "active");
	assert!(body["job"]["next_run"].is_string());
	let id = body["job"]["id"].as_str().unwrap().to_string();

	// It shows up in the listing.
	let response = app.clone().oneshot(get_request("/api/backup/jobs")).await.unwrap();
	let body = body_json(response).await;
	assert_eq!(body["jobs"].as_array().unwrap().len(), 1);

	// And in the scheduler status.
	let response = app
		.clone()
		.oneshot(get_request("/api/backup/status"))
		.await
		.unwrap();
	let body = body_json(response).await;
	assert_eq!(body["jobs"], 1);
	assert_eq!(body["scheduled"].as_array().unwrap().len(), 1);

	// Toggle pauses it and drops the trigger.
	let response = app
		.clone()
		.oneshot(json_request(
			"POST",
			&format!("/api/backup/jobs/{id}/toggle"),
			json!({}),
		))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	let body = body_json(response).await;
	assert_eq!(body["job"]["status"], "paused");

	let response = app
		.clone()
		.oneshot(get_request("/api/backup/status"))
		.await
		.unwrap();
	let body = body_json(response).await;
	assert!(body["scheduled"].as_array().unwrap().is_empty());

	// Patch the retention.
	let response = app
		.clone()
		.oneshot(json_request(
			"PATCH",
			&format!("/api/backup/jobs/{id}"),
			json!({ "retention_days": 3 }),
		))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	let body = body_json(response).await;
	assert_eq!(body["job"]["retention_days"], 3);

	// Delete; a second delete is a 404.
	let response = app
		.clone()
		.oneshot(
			Request::builder()
				.method("DELETE")
				.uri(format!("/api/backup/jobs/{id}"))
				.body(Body::empty())
				.unwrap(),
		)
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);

	let response = app
		.clone()
		.oneshot(
			Request::builder()
				.method("DELETE")
				.uri(format!("/api/backup/jobs/{id}"))
				.body(Body::empty())
				.unwrap(),
		)
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::NOT_FOUND);

	service.shutdown().await;
}

#[tokio::test]
async fn test_create_job_with_invalid_cron_is_rejected() {
	let (app, _service, _dir) = test_app().await;

	let response = app
		.oneshot(json_request(
			"POST",
			"/api/backup/jobs",
			json!({
				"name": "broken",
				"backup_type": "settings",
				"period": "daily",
				"cron_expression": "not a cron"
			}),
		))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	let body = body_json(response).await;
	assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_invalid_job_id_is_a_bad_request() {
	let (app, _service, _dir) = test_app().await;

	let response = app
		.oneshot(json_request(
			"POST",
			"/api/backup/jobs/not-a-uuid/toggle",
			json!({}),
		))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_manual_backup_create_list_delete() {
	let (app, _service, _dir) = test_app().await;

	// Create a settings backup (written directly, no shell involved).
	let response = app
		.clone()
		.oneshot(json_request(
			"POST",
			"/api/backup/create",
			json!({ "backup_type": "settings" }),
		))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	let body = body_json(response).await;
	let file = body["file"].as_str().unwrap().to_string();
	assert!(file.ends_with(".json"));

	// It is listed with an inferred type.
	let response = app
		.clone()
		.oneshot(get_request("/api/backup/files"))
		.await
		.unwrap();
	let body = body_json(response).await;
	let files = body["files"].as_array().unwrap();
	assert_eq!(files.len(), 1);
	assert_eq!(files[0]["backup_type"], "settings");
	assert_eq!(files[0]["name"], file.as_str());

	// Delete it by stem; deleting again is a 404.
	let stem = file.strip_suffix(".json").unwrap();
	let response = app
		.clone()
		.oneshot(json_request(
			"POST",
			"/api/backup/delete",
			json!({ "id": stem }),
		))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);

	let response = app
		.oneshot(json_request(
			"POST",
			"/api/backup/delete",
			json!({ "id": stem }),
		))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_restore_unknown_artifact_is_not_found() {
	let (app, _service, _dir) = test_app().await;

	let response = app
		.oneshot(json_request(
			"POST",
			"/api/backup/restore",
			json!({ "id": "full_backup_2026-01-01T00-00-00", "backup_type": "full" }),
		))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::NOT_FOUND);
	let body = body_json(response).await;
	assert_eq!(body["error"], "artifact_not_found");
}

#[tokio::test]
async fn test_restore_settings_is_not_implemented() {
	let (app, _service, _dir) = test_app().await;

	let response = app
		.clone()
		.oneshot(json_request(
			"POST",
			"/api/backup/create",
			json!({ "backup_type": "settings" }),
		))
		.await
		.unwrap();
	let body = body_json(response).await;
	let file = body["file"].as_str().unwrap().to_string();
	let stem = file.strip_suffix(".json").unwrap();

	let response = app
		.oneshot(json_request(
			"POST",
			"/api/backup/restore",
			json!({ "id": stem, "backup_type": "settings" }),
		))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn test_run_job_fires_pipeline() {
	let (app, service, dir) = test_app().await;

	// Manual-period database job; placeholder dump needs no shell command.
	let response = app
		.clone()
		.oneshot(json_request(
			"POST",
			"/api/backup/jobs",
			json!({
				"name": "on demand db",
				"backup_type": "database",
				"period": "manual",
				"cron_expression": "0 3 * * *"
			}),
		))
		.await
		.unwrap();
	let body = body_json(response).await;
	let id = body["job"]["id"].as_str().unwrap().to_string();

	let response = app
		.oneshot(json_request(
			"POST",
			&format!("/api/backup/jobs/{id}/run"),
			json!({}),
		))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	let body = body_json(response).await;
	assert_eq!(body["outcome"], "completed");
	let file = body["file"].as_str().unwrap();
	assert!(dir.path().join(file).exists());

	service.shutdown().await;
}
