// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Arca backup server binary.

use std::sync::Arc;

use arca_server::{create_router, AppState};
use arca_server_backup::{
	run_migrations, BackupService, CommandRunner, LocalMirrorUploader, NoopUploader,
	OffsiteUploader, ShellCommandRunner, SqliteJobStore,
};
use clap::{Parser, Subcommand};
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Arca server - backup scheduling and execution service.
#[derive(Parser, Debug)]
#[command(name = "arca-server", about = "Arca backup server", version)]
struct Args {
	/// Path to a TOML config file (overrides /etc/arca/server.toml)
	#[arg(long, env = "ARCA_SERVER_CONFIG")]
	config: Option<std::path::PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("arca-server version: {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	// Load .env file if present
	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => arca_server::load_config_with_file(path)?,
		None => arca_server::load_config()?,
	};

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		backup_root = %config.backup.root.display(),
		"starting arca-server"
	);

	// Create database pool and run migrations
	let pool = arca_server::db::create_pool(&config.database.url).await?;
	run_migrations(&pool).await?;

	let store = Arc::new(SqliteJobStore::new(pool));
	let runner: Arc<dyn CommandRunner> = Arc::new(ShellCommandRunner);
	let uploader: Arc<dyn OffsiteUploader> = match &config.backup.mirror_dir {
		Some(dir) => Arc::new(LocalMirrorUploader::new(dir)),
		None => Arc::new(NoopUploader),
	};

	let service = Arc::new(BackupService::new(
		config.backup.clone(),
		store,
		runner,
		uploader,
	));

	// Restore persisted jobs and their triggers
	let loaded = service.hydrate().await?;
	tracing::info!(jobs = loaded, "backup service hydrated");

	let app = create_router(AppState {
		service: Arc::clone(&service),
	})
	.layer(TraceLayer::new_for_http())
	.layer(
		CorsLayer::new()
			.allow_origin(Any)
			.allow_methods(Any)
			.allow_headers(Any),
	);

	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);

	let listener = tokio::net::TcpListener::bind(&addr).await?;

	// Run server with graceful shutdown
	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("received shutdown signal");
			service.shutdown().await;
		}
	}

	tracing::info!("server shutdown complete");
	Ok(())
}
