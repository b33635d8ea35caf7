// ABOUTME: Analysis pipeline: window resolution, aggregation, scoring, persistence
// ABOUTME: Empty windows short-circuit to an unpersisted zero-score result
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::context::ServerResources;
use crate::errors::{AppError, AppResult};
use crate::intelligence::{analyze, compute_stats, Insight, Suggestion, Warning};

/// Source tag written for locally scored analyses; "external" is reserved in
/// the schema for a model-backed analysis path
const SOURCE_LOCAL: &str = "local";

/// Kind of analysis window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    /// Last 7 days
    Weekly,
    /// Last 30 days
    Monthly,
    /// Explicit date range
    Custom,
}

impl PeriodKind {
    /// String representation used in persistence and API payloads
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Custom => "custom",
        }
    }
}

/// Response of one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    /// ID of the persisted record; None when nothing was persisted
    pub analysis_id: Option<String>,
    /// Health score (0-100)
    pub score: u8,
    pub insights: Vec<Insight>,
    pub suggestions: Vec<Suggestion>,
    pub warnings: Vec<Warning>,
    /// Where the result came from: "local" or "none"
    pub source: String,
}

fn parse_date(field: &str, value: &str) -> AppResult<NaiveDate> {
    value
        .parse::<NaiveDate>()
        .map_err(|_| AppError::invalid_input(format!("Invalid {field} '{value}', expected YYYY-MM-DD")))
}

/// Resolve the analysis window before touching any data
///
/// Weekly and monthly windows end today and reach back 7 or 30 days; either
/// bound can be overridden. Custom windows require both dates.
fn resolve_window(
    kind: PeriodKind,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> AppResult<(NaiveDate, NaiveDate)> {
    let today = Utc::now().date_naive();

    let default_span = match kind {
        PeriodKind::Weekly => Some(Duration::days(7)),
        PeriodKind::Monthly => Some(Duration::days(30)),
        PeriodKind::Custom => None,
    };

    let start = match (start_date, default_span) {
        (Some(value), _) => parse_date("start_date", value)?,
        (None, Some(span)) => today - span,
        (None, None) => {
            return Err(AppError::invalid_input(
                "Custom analysis requires start_date and end_date",
            ))
        }
    };

    let end = match (end_date, default_span) {
        (Some(value), _) => parse_date("end_date", value)?,
        (None, Some(_)) => today,
        (None, None) => {
            return Err(AppError::invalid_input(
                "Custom analysis requires start_date and end_date",
            ))
        }
    };

    if end < start {
        return Err(AppError::invalid_input("end_date is before start_date"));
    }

    Ok((start, end))
}

/// Run one analysis: resolve window, fetch, aggregate, score, persist
///
/// An empty window produces a zero-score result with a single `no_data`
/// warning and persists nothing.
///
/// # Errors
///
/// Returns an invalid-input error for malformed windows, or a database error
/// if fetching or persisting fails.
pub async fn run_analysis(
    resources: &ServerResources,
    user_id: Uuid,
    kind: PeriodKind,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> AppResult<AnalysisOutcome> {
    let (start, end) = resolve_window(kind, start_date, end_date)?;

    let entries = resources.entries.list_entries(user_id, start, end).await?;

    if entries.is_empty() {
        return Ok(AnalysisOutcome {
            analysis_id: None,
            score: 0,
            insights: Vec::new(),
            suggestions: Vec::new(),
            warnings: vec![Warning {
                kind: "no_data".into(),
                message: "No data in the selected period; record some entries first".into(),
            }],
            source: "none".into(),
        });
    }

    let snapshot = compute_stats(&entries, start, end);
    let result = analyze(&snapshot);

    let record = resources
        .analysis
        .insert(user_id, kind.as_str(), start, end, &result, SOURCE_LOCAL)
        .await?;

    info!(
        user_id = %user_id,
        period = kind.as_str(),
        score = result.score,
        entries = entries.len(),
        "Analysis completed"
    );

    Ok(AnalysisOutcome {
        analysis_id: Some(record.id),
        score: result.score,
        insights: result.insights,
        suggestions: result.suggestions,
        warnings: result.warnings,
        source: SOURCE_LOCAL.into(),
    })
}
