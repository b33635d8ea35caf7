// ABOUTME: Local analytics over journal entries, no I/O and no model calls
// ABOUTME: Re-exports the stats aggregator and the rule-based health scorer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

//! Deterministic analytics over gut-health journal entries
//!
//! Two pure stages: [`stats::compute_stats`] reduces a slice of entries to a
//! [`stats::StatsSnapshot`], and [`scorer::analyze`] turns a snapshot into a
//! scored [`scorer::AnalysisResult`]. Both are total functions so the same
//! window of entries always produces the same output.

pub mod scorer;
pub mod stats;

pub use scorer::{analyze, AnalysisResult, Insight, Suggestion, Warning};
pub use stats::{compute_stats, StatsSnapshot, TimeOfDayDistribution};
