// ABOUTME: HTTP handlers for running analyses and reading analysis history
// ABOUTME: Thin wrappers over the analysis service with bearer authentication
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::bearer_token;
use crate::context::ServerResources;
use crate::errors::{AppError, AppResult};
use crate::services::{run_analysis, AnalysisOutcome, PeriodKind};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for POST /api/analysis/analyze
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Window kind; defaults to weekly
    #[serde(default = "default_period_kind")]
    pub period_kind: PeriodKind,
    /// Explicit window start (YYYY-MM-DD)
    pub start_date: Option<String>,
    /// Explicit window end (YYYY-MM-DD)
    pub end_date: Option<String>,
}

const fn default_period_kind() -> PeriodKind {
    PeriodKind::Weekly
}

/// One persisted analysis in the history listing
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisHistoryItem {
    pub analysis_id: String,
    pub period_kind: String,
    pub period_start: String,
    pub period_end: String,
    pub score: i64,
    pub insights: Value,
    pub suggestions: Value,
    pub warnings: Value,
    pub source: String,
    pub created_at: String,
}

/// Response for GET /api/analysis/history
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisHistoryResponse {
    pub analyses: Vec<AnalysisHistoryItem>,
    pub total: usize,
}

// ============================================================================
// Routes
// ============================================================================

/// Analysis endpoints
pub struct AnalysisRoutes;

impl AnalysisRoutes {
    /// Build the analysis router
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/analysis/analyze", post(Self::analyze))
            .route("/api/analysis/history", get(Self::history))
            .with_state(resources)
    }

    async fn authenticate(resources: &ServerResources, headers: &HeaderMap) -> AppResult<Uuid> {
        let token = bearer_token(headers)?;
        resources.identity.resolve(token).await
    }

    /// Handle POST /api/analysis/analyze
    async fn analyze(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<AnalyzeRequest>,
    ) -> Result<Json<AnalysisOutcome>, AppError> {
        let user_id = Self::authenticate(&resources, &headers).await?;

        let outcome = run_analysis(
            &resources,
            user_id,
            request.period_kind,
            request.start_date.as_deref(),
            request.end_date.as_deref(),
        )
        .await?;

        Ok(Json(outcome))
    }

    /// Handle GET /api/analysis/history
    ///
    /// Returns the newest persisted analyses, most recent first. The stored
    /// JSON columns are re-parsed so clients get structured arrays back.
    async fn history(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Json<AnalysisHistoryResponse>, AppError> {
        let user_id = Self::authenticate(&resources, &headers).await?;

        let records = resources.analysis.list_recent(user_id).await?;

        let analyses: Vec<AnalysisHistoryItem> = records
            .into_iter()
            .map(|r| AnalysisHistoryItem {
                analysis_id: r.id,
                period_kind: r.period_kind,
                period_start: r.period_start,
                period_end: r.period_end,
                score: r.score,
                insights: parse_stored_json(&r.insights),
                suggestions: parse_stored_json(&r.suggestions),
                warnings: parse_stored_json(&r.warnings),
                source: r.source_tag,
                created_at: r.created_at,
            })
            .collect();
        let total = analyses.len();

        Ok(Json(AnalysisHistoryResponse { analyses, total }))
    }
}

/// Parse a stored JSON column, falling back to an empty array
fn parse_stored_json(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::Array(Vec::new()))
}
