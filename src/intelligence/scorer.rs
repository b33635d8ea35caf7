// ABOUTME: Rule-based health scorer producing a 0-100 score with narrative output
// ABOUTME: Derives insights, suggestions, and warnings from a stats snapshot
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

//! Heuristic scoring over a [`StatsSnapshot`]
//!
//! The scorer is the always-available analysis path: no network, no model, a
//! fixed rule table over frequency, duration, category shape, and reported
//! feeling. Categories follow the Bristol-style 1-7 ordinal where 3 and 4 are
//! the healthy middle and 1 and 7 the extremes.

use crate::intelligence::stats::StatsSnapshot;
use crate::models::Feeling;
use serde::{Deserialize, Serialize};

/// Base score before any adjustment
const BASE_SCORE: i64 = 60;

/// One narrative observation derived from the statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: String,
    pub title: String,
    pub description: String,
}

/// One actionable recommendation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub category: String,
    pub text: String,
}

/// One warning about a concerning pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: String,
    pub message: String,
}

/// Complete output of one analysis run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Health score clamped to [0, 100]
    pub score: u8,
    pub insights: Vec<Insight>,
    pub suggestions: Vec<Suggestion>,
    pub warnings: Vec<Warning>,
}

/// Fixed per-category descriptions, index 0 unused
const CATEGORY_DESCRIPTIONS: [&str; 8] = [
    "",
    "constipation-leaning (separate hard lumps)",
    "mild constipation (lumpy and sausage-like)",
    "normal (sausage-shaped with surface cracks)",
    "ideal (smooth and soft)",
    "lacking fiber (soft blobs with clear edges)",
    "mild diarrhea (mushy consistency)",
    "diarrhea (entirely liquid)",
];

/// Run the full rule table over a snapshot
#[must_use]
pub fn analyze(snapshot: &StatsSnapshot) -> AnalysisResult {
    AnalysisResult {
        score: score(snapshot),
        insights: insights(snapshot),
        suggestions: suggestions(snapshot),
        warnings: warnings(snapshot),
    }
}

fn healthy_ratio(snapshot: &StatsSnapshot) -> f64 {
    let healthy: u64 = [3u8, 4]
        .iter()
        .filter_map(|c| snapshot.category_distribution.get(c))
        .sum();
    let total: u64 = snapshot.category_distribution.values().sum();
    healthy as f64 / total.max(1) as f64
}

fn extreme_ratio(snapshot: &StatsSnapshot) -> f64 {
    let extreme: u64 = [1u8, 7]
        .iter()
        .filter_map(|c| snapshot.category_distribution.get(c))
        .sum();
    let total: u64 = snapshot.category_distribution.values().sum();
    extreme as f64 / total.max(1) as f64
}

fn smooth_ratio(snapshot: &StatsSnapshot) -> f64 {
    let smooth = snapshot
        .feeling_distribution
        .get(&Feeling::Smooth)
        .copied()
        .unwrap_or(0);
    let total: u64 = snapshot.feeling_distribution.values().sum();
    smooth as f64 / total.max(1) as f64
}

fn strained_ratio(snapshot: &StatsSnapshot) -> f64 {
    let strained: u64 = [Feeling::Difficult, Feeling::Painful]
        .iter()
        .filter_map(|f| snapshot.feeling_distribution.get(f))
        .sum();
    let total: u64 = snapshot.feeling_distribution.values().sum();
    strained as f64 / total.max(1) as f64
}

fn score(snapshot: &StatsSnapshot) -> u8 {
    let mut score = BASE_SCORE;

    let freq = snapshot.avg_frequency;
    if (0.8..=2.5).contains(&freq) {
        score += 15;
    } else if (0.5..0.8).contains(&freq) || (freq > 2.5 && freq <= 3.0) {
        score += 5;
    } else {
        score -= 10;
    }

    let duration = snapshot.avg_duration_minutes;
    if (3.0..=15.0).contains(&duration) {
        score += 10;
    } else if (1.0..3.0).contains(&duration) || (duration > 15.0 && duration <= 20.0) {
        score += 5;
    } else {
        score -= 5;
    }

    score += (healthy_ratio(snapshot) * 15.0).floor() as i64;
    score += (smooth_ratio(snapshot) * 10.0).floor() as i64;

    score.clamp(0, 100) as u8
}

fn insights(snapshot: &StatsSnapshot) -> Vec<Insight> {
    let mut insights = Vec::new();

    let peak = snapshot.time_of_day.peak();
    let habit = if peak == "morning" { "healthy" } else { "typical" };
    insights.push(Insight {
        kind: "pattern".into(),
        title: "Time-of-day pattern".into(),
        description: format!("Your occurrences cluster in the {peak}, which is a {habit} habit"),
    });

    if !snapshot.category_distribution.is_empty() {
        // Ties go to the lower category code
        let (&top_category, _) = snapshot
            .category_distribution
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .unwrap_or((&4, &0));
        let description = CATEGORY_DESCRIPTIONS
            .get(top_category as usize)
            .copied()
            .unwrap_or("unknown");
        insights.push(Insight {
            kind: "category".into(),
            title: "Category profile".into(),
            description: format!(
                "Your most frequent category is type {top_category} ({description})"
            ),
        });
    }

    if snapshot.avg_frequency != 0.0 {
        let status = if snapshot.avg_frequency < 0.5 {
            "which is on the low side"
        } else if snapshot.avg_frequency > 3.0 {
            "which is on the high side"
        } else {
            "which is within the normal range"
        };
        insights.push(Insight {
            kind: "frequency".into(),
            title: "Daily frequency".into(),
            description: format!(
                "You average {} occurrences per recorded day, {status}",
                snapshot.avg_frequency
            ),
        });
    }

    insights
}

fn suggestions(snapshot: &StatsSnapshot) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    if healthy_ratio(snapshot) < 0.5 {
        suggestions.push(Suggestion {
            category: "diet".into(),
            text: "Increase dietary fiber with more vegetables, fruit, and whole grains \
                   to move toward a healthier consistency"
                .into(),
        });
    }

    if snapshot.avg_duration_minutes > 15.0 {
        suggestions.push(Suggestion {
            category: "habit".into(),
            text: "Long durations can indicate constipation; drink more water, stay active, \
                   and avoid phone use on the toilet"
                .into(),
        });
    }

    if snapshot.avg_frequency != 0.0 && snapshot.avg_frequency < 0.8 {
        suggestions.push(Suggestion {
            category: "lifestyle".into(),
            text: "Frequency is on the low side; increase daily activity, keep a regular \
                   routine, and consult a doctor if it persists"
                .into(),
        });
    }

    if strained_ratio(snapshot) > 0.3 {
        suggestions.push(Suggestion {
            category: "health".into(),
            text: "Difficult or painful occurrences are frequent; increase fluid intake \
                   and seek medical advice if symptoms continue"
                .into(),
        });
    }

    if suggestions.is_empty() {
        suggestions.push(Suggestion {
            category: "general".into(),
            text: "Your gut health looks good; keep up your current habits".into(),
        });
    }

    suggestions
}

fn warnings(snapshot: &StatsSnapshot) -> Vec<Warning> {
    let mut warnings = Vec::new();

    if snapshot.avg_frequency > 4.0 {
        warnings.push(Warning {
            kind: "high_frequency".into(),
            message: "Frequency is unusually high and may indicate diarrhea; watch your \
                      diet and consult a doctor"
                .into(),
        });
    }

    if snapshot.avg_frequency != 0.0 && snapshot.avg_frequency < 0.3 {
        warnings.push(Warning {
            kind: "low_frequency".into(),
            message: "Frequency is very low and may indicate constipation; increase fiber \
                      and fluid intake"
                .into(),
        });
    }

    if extreme_ratio(snapshot) > 0.3 {
        warnings.push(Warning {
            kind: "abnormal_pattern".into(),
            message: "A high share of entries fall in the extreme categories; review your \
                      diet and consult a doctor if this continues"
                .into(),
        });
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn snapshot() -> StatsSnapshot {
        StatsSnapshot {
            total_occurrences: 7,
            window_days: 7,
            recorded_days: 7,
            coverage_rate: 1.0,
            avg_frequency: 1.0,
            avg_duration_minutes: 8.0,
            category_distribution: BTreeMap::from([(4, 7)]),
            feeling_distribution: BTreeMap::from([(Feeling::Smooth, 7)]),
            time_of_day: crate::intelligence::stats::TimeOfDayDistribution {
                morning: 7,
                afternoon: 0,
                evening: 0,
            },
        }
    }

    #[test]
    fn test_ideal_week_scores_one_hundred() {
        // 60 + 15 (frequency) + 10 (duration) + 15 (all healthy) + 10 (all smooth)
        let result = analyze(&snapshot());
        assert_eq!(result.score, 100);
    }

    #[test]
    fn test_score_clamped_low() {
        let mut s = snapshot();
        s.avg_frequency = 6.0;
        s.avg_duration_minutes = 45.0;
        s.category_distribution = BTreeMap::from([(1, 10)]);
        s.feeling_distribution = BTreeMap::from([(Feeling::Painful, 10)]);
        let result = analyze(&s);
        // 60 - 10 - 5 + 0 + 0 = 45, well inside range but every penalty applied
        assert_eq!(result.score, 45);
    }

    #[test]
    fn test_empty_snapshot_never_underflows() {
        let result = analyze(&StatsSnapshot::default());
        // 60 - 10 - 5, ratios contribute nothing
        assert_eq!(result.score, 45);
    }

    #[test]
    fn test_partial_ratios_floor() {
        let mut s = snapshot();
        // 2 of 3 healthy: floor((2/3) * 15) = 10; 1 of 3 smooth: floor((1/3) * 10) = 3
        s.category_distribution = BTreeMap::from([(4, 2), (6, 1)]);
        s.feeling_distribution =
            BTreeMap::from([(Feeling::Smooth, 1), (Feeling::Difficult, 2)]);
        let result = analyze(&s);
        assert_eq!(result.score, 60 + 15 + 10 + 10 + 3);
    }

    #[test]
    fn test_boundary_frequency_tiers() {
        let mut s = snapshot();
        s.category_distribution.clear();
        s.feeling_distribution.clear();
        s.avg_frequency = 0.8;
        assert_eq!(analyze(&s).score, 85);
        s.avg_frequency = 0.79;
        assert_eq!(analyze(&s).score, 75);
        s.avg_frequency = 3.0;
        assert_eq!(analyze(&s).score, 75);
        s.avg_frequency = 3.01;
        assert_eq!(analyze(&s).score, 60);
    }

    #[test]
    fn test_insight_order_and_morning_label() {
        let result = analyze(&snapshot());
        assert_eq!(result.insights.len(), 3);
        assert_eq!(result.insights[0].kind, "pattern");
        assert!(result.insights[0].description.contains("morning"));
        assert!(result.insights[0].description.contains("healthy"));
        assert_eq!(result.insights[1].kind, "category");
        assert!(result.insights[1].description.contains("type 4"));
        assert_eq!(result.insights[2].kind, "frequency");
    }

    #[test]
    fn test_evening_peak_is_typical() {
        let mut s = snapshot();
        s.time_of_day = crate::intelligence::stats::TimeOfDayDistribution {
            morning: 0,
            afternoon: 1,
            evening: 5,
        };
        let result = analyze(&s);
        assert!(result.insights[0].description.contains("evening"));
        assert!(result.insights[0].description.contains("typical"));
    }

    #[test]
    fn test_healthy_snapshot_gets_single_generic_suggestion() {
        let result = analyze(&snapshot());
        assert_eq!(result.suggestions.len(), 1);
        assert_eq!(result.suggestions[0].category, "general");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_unhealthy_snapshot_fires_rules() {
        let mut s = snapshot();
        s.avg_frequency = 0.2;
        s.avg_duration_minutes = 25.0;
        s.category_distribution = BTreeMap::from([(1, 4), (4, 1)]);
        s.feeling_distribution =
            BTreeMap::from([(Feeling::Painful, 2), (Feeling::Smooth, 1)]);
        let result = analyze(&s);

        let categories: Vec<&str> =
            result.suggestions.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(categories, vec!["diet", "habit", "lifestyle", "health"]);

        let kinds: Vec<&str> = result.warnings.iter().map(|w| w.kind.as_str()).collect();
        assert_eq!(kinds, vec!["low_frequency", "abnormal_pattern"]);
    }

    #[test]
    fn test_zero_frequency_skips_frequency_rules() {
        let mut s = snapshot();
        s.avg_frequency = 0.0;
        let result = analyze(&s);
        assert!(result.insights.iter().all(|i| i.kind != "frequency"));
        assert!(result.warnings.iter().all(|w| w.kind != "low_frequency"));
    }
}
