// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Arca backup server.
//!
//! HTTP front end for the backup scheduling and execution service in
//! `arca-server-backup`: layered configuration, SQLite persistence, and a
//! JSON API over the job registry.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;

pub use api::{create_router, AppState};
pub use config::{load_config, load_config_with_file, ConfigError, ServerConfig};
pub use error::ServerError;
