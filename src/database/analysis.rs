// ABOUTME: Append-only persistence for completed analysis runs
// ABOUTME: Stores scored results with JSON-serialized narrative fields
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

use crate::errors::{AppError, AppResult};
use crate::intelligence::AnalysisResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// How many records the history listing returns
const HISTORY_LIMIT: i64 = 10;

/// A persisted analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// Unique record ID
    pub id: String,
    /// User the analysis belongs to
    pub user_id: String,
    /// Period kind: weekly, monthly, or custom
    pub period_kind: String,
    /// First day of the analyzed window (ISO date)
    pub period_start: String,
    /// Last day of the analyzed window (ISO date)
    pub period_end: String,
    /// Health score (0-100)
    pub score: i64,
    /// Insights as a JSON array
    pub insights: String,
    /// Suggestions as a JSON array
    pub suggestions: String,
    /// Warnings as a JSON array
    pub warnings: String,
    /// Where the result came from; only "local" is written today
    pub source_tag: String,
    /// When the analysis ran (RFC 3339)
    pub created_at: String,
}

/// Analysis record store
pub struct AnalysisManager {
    pool: SqlitePool,
}

impl AnalysisManager {
    /// Create a new analysis manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist one analysis run
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database operation fails
    pub async fn insert(
        &self,
        user_id: Uuid,
        period_kind: &str,
        period_start: NaiveDate,
        period_end: NaiveDate,
        result: &AnalysisResult,
        source_tag: &str,
    ) -> AppResult<AnalysisRecord> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        let insights = serde_json::to_string(&result.insights)
            .map_err(|e| AppError::internal(format!("Failed to serialize insights: {e}")))?;
        let suggestions = serde_json::to_string(&result.suggestions)
            .map_err(|e| AppError::internal(format!("Failed to serialize suggestions: {e}")))?;
        let warnings = serde_json::to_string(&result.warnings)
            .map_err(|e| AppError::internal(format!("Failed to serialize warnings: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO analyses (id, user_id, period_kind, period_start, period_end,
                                  score, insights, suggestions, warnings, source_tag, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(&id)
        .bind(user_id.to_string())
        .bind(period_kind)
        .bind(period_start.to_string())
        .bind(period_end.to_string())
        .bind(i64::from(result.score))
        .bind(&insights)
        .bind(&suggestions)
        .bind(&warnings)
        .bind(source_tag)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to insert analysis: {e}")))?;

        Ok(AnalysisRecord {
            id,
            user_id: user_id.to_string(),
            period_kind: period_kind.to_owned(),
            period_start: period_start.to_string(),
            period_end: period_end.to_string(),
            score: i64::from(result.score),
            insights,
            suggestions,
            warnings,
            source_tag: source_tag.to_owned(),
            created_at: now,
        })
    }

    /// List a user's most recent analyses, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn list_recent(&self, user_id: Uuid) -> AppResult<Vec<AnalysisRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, period_kind, period_start, period_end,
                   score, insights, suggestions, warnings, source_tag, created_at
            FROM analyses
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            ",
        )
        .bind(user_id.to_string())
        .bind(HISTORY_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list analyses: {e}")))?;

        let records = rows
            .into_iter()
            .map(|r| AnalysisRecord {
                id: r.get("id"),
                user_id: r.get("user_id"),
                period_kind: r.get("period_kind"),
                period_start: r.get("period_start"),
                period_end: r.get("period_end"),
                score: r.get("score"),
                insights: r.get("insights"),
                suggestions: r.get("suggestions"),
                warnings: r.get("warnings"),
                source_tag: r.get("source_tag"),
                created_at: r.get("created_at"),
            })
            .collect();

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_util::memory_pool;
    use crate::intelligence::{Insight, Suggestion, Warning};

    fn result() -> AnalysisResult {
        AnalysisResult {
            score: 85,
            insights: vec![Insight {
                kind: "pattern".into(),
                title: "t".into(),
                description: "d".into(),
            }],
            suggestions: vec![Suggestion {
                category: "general".into(),
                text: "keep it up".into(),
            }],
            warnings: Vec::<Warning>::new(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_roundtrip() {
        let manager = AnalysisManager::new(memory_pool().await);
        let user = Uuid::new_v4();

        let record = manager
            .insert(
                user,
                "weekly",
                "2025-03-01".parse().unwrap(),
                "2025-03-08".parse().unwrap(),
                &result(),
                "local",
            )
            .await
            .unwrap();
        assert_eq!(record.score, 85);

        let listed = manager.list_recent(user).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, record.id);
        assert!(listed[0].insights.contains("pattern"));
        assert_eq!(listed[0].source_tag, "local");
    }

    #[tokio::test]
    async fn test_list_recent_caps_at_ten_newest_first() {
        let manager = AnalysisManager::new(memory_pool().await);
        let user = Uuid::new_v4();

        for _ in 0..12 {
            manager
                .insert(
                    user,
                    "weekly",
                    "2025-03-01".parse().unwrap(),
                    "2025-03-08".parse().unwrap(),
                    &result(),
                    "local",
                )
                .await
                .unwrap();
        }

        let listed = manager.list_recent(user).await.unwrap();
        assert_eq!(listed.len(), 10);
        assert!(listed.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }
}
