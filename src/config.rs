// ABOUTME: Server configuration loaded from environment variables
// ABOUTME: Holds the HTTP port and database URL used at startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

//! Server configuration management
//!
//! All process-level configuration is read once at startup and passed
//! explicitly. Per-user model credentials live in the settings store, not
//! here (the gateway receives them per call).

use crate::errors::{AppError, AppResult};
use std::env;

/// Default HTTP port for the server
pub const DEFAULT_HTTP_PORT: u16 = 8081;

/// Default SQLite database URL
pub const DEFAULT_DATABASE_URL: &str = "sqlite:gutcheck.db";

/// Process-level server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for the HTTP API
    pub http_port: u16,
    /// SQLite database URL
    pub database_url: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// Reads `GUTCHECK_HTTP_PORT` and `GUTCHECK_DATABASE_URL`, falling back
    /// to defaults when unset.
    ///
    /// # Errors
    ///
    /// Returns a config error if `GUTCHECK_HTTP_PORT` is set but not a valid
    /// port number.
    pub fn from_env() -> AppResult<Self> {
        let http_port = match env::var("GUTCHECK_HTTP_PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|e| AppError::config(format!("Invalid GUTCHECK_HTTP_PORT '{raw}': {e}")))?,
            Err(_) => DEFAULT_HTTP_PORT,
        };

        let database_url =
            env::var("GUTCHECK_DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned());

        Ok(Self {
            http_port,
            database_url,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            database_url: DEFAULT_DATABASE_URL.to_owned(),
        }
    }
}
