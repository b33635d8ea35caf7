// ABOUTME: SQLite persistence layer: pool creation, schema setup, and managers
// ABOUTME: Re-exports the chat, entry, settings, and analysis managers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

//! # Persistence Layer
//!
//! All storage goes through `sqlx` over SQLite. Timestamps are RFC 3339 TEXT,
//! ids are UUID v4 strings, dates are ISO `YYYY-MM-DD` TEXT. The schema is
//! created idempotently at startup; there is no separate migration step.
//!
//! Entry, settings, and session tables are written by the surrounding
//! journaling/auth/settings layers and only read here.

pub mod analysis;
pub mod chat;
pub mod entries;
pub mod users;

pub use analysis::{AnalysisManager, AnalysisRecord};
pub use chat::{ChatManager, ConversationRecord, ConversationSummary, MessageRecord};
pub use entries::EntryManager;
pub use users::{UserAiSettings, UserManager};

use crate::errors::{AppError, AppResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

/// Open the SQLite pool, creating the database file if needed
///
/// Foreign keys are enabled so conversation deletion cascades to messages.
///
/// # Errors
///
/// Returns an error if the URL is invalid or the database cannot be opened.
pub async fn connect(database_url: &str) -> AppResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| AppError::config(format!("Invalid database URL '{database_url}': {e}")))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

    info!("Database pool opened: {database_url}");
    Ok(pool)
}

/// Create all tables if they do not exist
///
/// # Errors
///
/// Returns an error if a DDL statement fails.
pub async fn init_schema(pool: &SqlitePool) -> AppResult<()> {
    let statements = [
        r"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        ",
        r"
        CREATE TABLE IF NOT EXISTS user_ai_settings (
            user_id TEXT PRIMARY KEY,
            api_key TEXT,
            base_url TEXT,
            model TEXT,
            default_system_prompt TEXT,
            auto_title INTEGER NOT NULL DEFAULT 0
        )
        ",
        r"
        CREATE TABLE IF NOT EXISTS log_entries (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            entry_date TEXT NOT NULL,
            entry_time TEXT,
            duration_minutes INTEGER,
            category INTEGER,
            feeling TEXT,
            notes TEXT,
            is_absence_marker INTEGER NOT NULL DEFAULT 0
        )
        ",
        r"
        CREATE INDEX IF NOT EXISTS idx_log_entries_user_date
        ON log_entries (user_id, entry_date)
        ",
        r"
        CREATE TABLE IF NOT EXISTS chat_conversations (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT,
            system_prompt TEXT,
            thinking_intensity TEXT NOT NULL DEFAULT 'medium',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        ",
        r"
        CREATE TABLE IF NOT EXISTS chat_messages (
            id TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL
                REFERENCES chat_conversations (id) ON DELETE CASCADE,
            seq INTEGER NOT NULL,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (conversation_id, seq)
        )
        ",
        r"
        CREATE TABLE IF NOT EXISTS analyses (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            period_kind TEXT NOT NULL,
            period_start TEXT NOT NULL,
            period_end TEXT NOT NULL,
            score INTEGER NOT NULL,
            insights TEXT NOT NULL,
            suggestions TEXT NOT NULL,
            warnings TEXT NOT NULL,
            source_tag TEXT NOT NULL DEFAULT 'local',
            created_at TEXT NOT NULL
        )
        ",
    ];

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to initialize schema: {e}")))?;
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;

    /// In-memory pool for unit tests
    ///
    /// A single connection keeps every query on the same in-memory database.
    pub async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(
                SqliteConnectOptions::from_str("sqlite::memory:")
                    .unwrap()
                    .foreign_keys(true),
            )
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();
        pool
    }
}
