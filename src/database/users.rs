// ABOUTME: Read-only access to per-user AI settings and bearer sessions
// ABOUTME: Both tables are written by the excluded settings and auth layers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Per-user model endpoint settings
///
/// A user with no settings row gets the all-empty default, which the gateway
/// reports as unconfigured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserAiSettings {
    /// Bearer API key for the user's endpoint
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API
    pub base_url: Option<String>,
    /// Model identifier
    pub model: Option<String>,
    /// User-level default system prompt
    pub default_system_prompt: Option<String>,
    /// Whether to auto-generate conversation titles via the model
    pub auto_title: bool,
}

impl UserAiSettings {
    /// Whether key, endpoint, and model are all present and non-empty
    #[must_use]
    pub fn is_configured(&self) -> bool {
        fn set(value: &Option<String>) -> bool {
            value.as_deref().is_some_and(|v| !v.is_empty())
        }
        set(&self.api_key) && set(&self.base_url) && set(&self.model)
    }
}

/// User settings and session lookups
pub struct UserManager {
    pool: SqlitePool,
}

impl UserManager {
    /// Create a new user manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Resolve a bearer session token to a user id
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or the stored user id
    /// is malformed
    pub async fn find_user_by_session(&self, token: &str) -> AppResult<Option<Uuid>> {
        let row = sqlx::query(
            r"
            SELECT user_id
            FROM sessions
            WHERE token = $1
            ",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to look up session: {e}")))?;

        row.map(|r| {
            let user_id: String = r.get("user_id");
            Uuid::parse_str(&user_id)
                .map_err(|e| AppError::database(format!("Malformed user id in session: {e}")))
        })
        .transpose()
    }

    /// Load a user's AI settings, defaulting when no row exists
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_ai_settings(&self, user_id: Uuid) -> AppResult<UserAiSettings> {
        let row = sqlx::query(
            r"
            SELECT api_key, base_url, model, default_system_prompt, auto_title
            FROM user_ai_settings
            WHERE user_id = $1
            ",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load AI settings: {e}")))?;

        Ok(row.map_or_else(UserAiSettings::default, |r| UserAiSettings {
            api_key: r.get("api_key"),
            base_url: r.get("base_url"),
            model: r.get("model"),
            default_system_prompt: r.get("default_system_prompt"),
            auto_title: r.get("auto_title"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_util::memory_pool;

    #[tokio::test]
    async fn test_session_lookup() {
        let pool = memory_pool().await;
        let manager = UserManager::new(pool.clone());
        let user = Uuid::new_v4();

        sqlx::query("INSERT INTO sessions (token, user_id, created_at) VALUES ($1, $2, $3)")
            .bind("tok-1")
            .bind(user.to_string())
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&pool)
            .await
            .unwrap();

        assert_eq!(manager.find_user_by_session("tok-1").await.unwrap(), Some(user));
        assert_eq!(manager.find_user_by_session("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_settings_row_defaults_to_unconfigured() {
        let pool = memory_pool().await;
        let manager = UserManager::new(pool);

        let settings = manager.get_ai_settings(Uuid::new_v4()).await.unwrap();
        assert!(!settings.is_configured());
        assert!(!settings.auto_title);
    }

    #[tokio::test]
    async fn test_settings_row_is_loaded() {
        let pool = memory_pool().await;
        let manager = UserManager::new(pool.clone());
        let user = Uuid::new_v4();

        sqlx::query(
            r"
            INSERT INTO user_ai_settings (user_id, api_key, base_url, model, default_system_prompt, auto_title)
            VALUES ($1, 'sk-test', 'https://api.example.com/v1', 'test-model', NULL, 1)
            ",
        )
        .bind(user.to_string())
        .execute(&pool)
        .await
        .unwrap();

        let settings = manager.get_ai_settings(user).await.unwrap();
        assert!(settings.is_configured());
        assert!(settings.auto_title);
        assert_eq!(settings.model.as_deref(), Some("test-model"));
    }
}
