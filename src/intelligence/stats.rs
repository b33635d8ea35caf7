// ABOUTME: Statistics aggregator reducing journal entries to a snapshot
// ABOUTME: Computes frequency, duration, coverage, and distribution metrics
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

//! Pure statistics over a window of journal entries

use crate::models::{Feeling, LogEntry};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Counts of occurrences per time-of-day bucket
///
/// Morning is [06:00, 12:00), afternoon [12:00, 18:00), everything else is
/// evening. Entries without a recorded time fall in no bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDayDistribution {
    pub morning: u64,
    pub afternoon: u64,
    pub evening: u64,
}

impl TimeOfDayDistribution {
    /// Bucket name with the highest count, ties broken morning > afternoon > evening
    #[must_use]
    pub const fn peak(&self) -> &'static str {
        if self.morning >= self.afternoon && self.morning >= self.evening {
            "morning"
        } else if self.afternoon >= self.evening {
            "afternoon"
        } else {
            "evening"
        }
    }
}

/// Aggregated statistics for one analysis window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Number of occurrence entries (absence markers excluded)
    pub total_occurrences: u64,
    /// Window length in days, never below 1
    pub window_days: i64,
    /// Distinct dates with at least one entry (absence markers included)
    pub recorded_days: u64,
    /// `recorded_days / window_days`, rounded to 2 decimals
    pub coverage_rate: f64,
    /// Occurrences per recorded day, rounded to 2 decimals; 0 when nothing recorded
    pub avg_frequency: f64,
    /// Mean duration over entries carrying one, rounded to 1 decimal; 0 when none
    pub avg_duration_minutes: f64,
    /// Occurrence count per category code (1-7)
    pub category_distribution: BTreeMap<u8, u64>,
    /// Occurrence count per reported feeling
    pub feeling_distribution: BTreeMap<Feeling, u64>,
    /// Occurrence count per time-of-day bucket
    pub time_of_day: TimeOfDayDistribution,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Reduce a window of entries to a [`StatsSnapshot`]
///
/// The window length is `end - start` in days, clamped to at least 1 so that
/// same-day windows still produce a meaningful coverage rate. Frequency is
/// relative to recorded days, not window days: a user who logs three days out
/// of thirty is measured against those three days.
#[must_use]
pub fn compute_stats(entries: &[LogEntry], start: NaiveDate, end: NaiveDate) -> StatsSnapshot {
    let window_days = (end - start).num_days().max(1);

    let recorded_dates: BTreeSet<NaiveDate> = entries.iter().map(|e| e.entry_date).collect();
    let recorded_days = recorded_dates.len() as u64;

    let occurrences: Vec<&LogEntry> = entries.iter().filter(|e| !e.is_absence_marker).collect();
    let total_occurrences = occurrences.len() as u64;

    let coverage_rate = round2(recorded_days as f64 / window_days as f64);

    let avg_frequency = if recorded_days > 0 {
        round2(total_occurrences as f64 / recorded_days as f64)
    } else {
        0.0
    };

    let durations: Vec<i64> = occurrences
        .iter()
        .filter_map(|e| e.duration_minutes)
        .collect();
    let avg_duration_minutes = if durations.is_empty() {
        0.0
    } else {
        round1(durations.iter().sum::<i64>() as f64 / durations.len() as f64)
    };

    let mut category_distribution = BTreeMap::new();
    for entry in &occurrences {
        if let Some(category) = entry.category {
            *category_distribution.entry(category).or_insert(0) += 1;
        }
    }

    let mut feeling_distribution = BTreeMap::new();
    for entry in &occurrences {
        if let Some(feeling) = entry.feeling {
            *feeling_distribution.entry(feeling).or_insert(0) += 1;
        }
    }

    let mut time_of_day = TimeOfDayDistribution::default();
    for entry in &occurrences {
        if let Some(hour) = entry.hour() {
            if (6..12).contains(&hour) {
                time_of_day.morning += 1;
            } else if (12..18).contains(&hour) {
                time_of_day.afternoon += 1;
            } else {
                time_of_day.evening += 1;
            }
        }
    }

    StatsSnapshot {
        total_occurrences,
        window_days,
        recorded_days,
        coverage_rate,
        avg_frequency,
        avg_duration_minutes,
        category_distribution,
        feeling_distribution,
        time_of_day,
    }
}
