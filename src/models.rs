// ABOUTME: Common domain models shared across the analytics and chat subsystems
// ABOUTME: Defines LogEntry, the feeling enumeration, and thinking intensity
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

//! Common data models for gut-health journal data

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How an occurrence felt, as reported by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feeling {
    /// Smooth, comfortable occurrence
    Smooth,
    /// Required noticeable effort
    Difficult,
    /// Painful occurrence
    Painful,
    /// Sudden urgency
    Urgent,
    /// Feeling of incomplete evacuation
    Incomplete,
}

impl Feeling {
    /// String representation used in persistence and API payloads
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Smooth => "smooth",
            Self::Difficult => "difficult",
            Self::Painful => "painful",
            Self::Urgent => "urgent",
            Self::Incomplete => "incomplete",
        }
    }

    /// Parse from the persisted string form
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "smooth" => Some(Self::Smooth),
            "difficult" => Some(Self::Difficult),
            "painful" => Some(Self::Painful),
            "urgent" => Some(Self::Urgent),
            "incomplete" => Some(Self::Incomplete),
            _ => None,
        }
    }
}

/// Coarse knob controlling model sampling temperature and response budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingIntensity {
    /// Faster, more exploratory replies
    Low,
    /// Balanced default
    Medium,
    /// Slower, more deliberate replies
    High,
}

impl ThinkingIntensity {
    /// String representation used in persistence and API payloads
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parse from the persisted string form
    ///
    /// Unrecognized values map to `None`; callers fall back to default
    /// sampling parameters rather than rejecting the conversation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl Default for ThinkingIntensity {
    fn default() -> Self {
        Self::Medium
    }
}

/// A single journal entry, consumed read-only by the analytics subsystem
///
/// Entry CRUD and identifier generation belong to the journaling layer; this
/// crate only queries entries by user and date range. An absence marker
/// records a day explicitly observed with no occurrence; the journaling layer
/// guarantees it never coexists with a normal entry on the same date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique entry ID
    pub id: String,
    /// Owner of the entry
    pub user_id: Uuid,
    /// Calendar day of the occurrence
    pub entry_date: NaiveDate,
    /// Clock time (`HH:MM` or `HH:MM:SS`), if recorded
    pub entry_time: Option<String>,
    /// Duration in minutes, if recorded
    pub duration_minutes: Option<i64>,
    /// Bristol-style category code (1-7), if recorded
    pub category: Option<u8>,
    /// Reported feeling, if recorded
    pub feeling: Option<Feeling>,
    /// Free-text notes
    pub notes: Option<String>,
    /// Day explicitly marked as having no occurrence
    pub is_absence_marker: bool,
}

impl LogEntry {
    /// Hour of day parsed from `entry_time`, if present and well-formed
    #[must_use]
    pub fn hour(&self) -> Option<u32> {
        let time = self.entry_time.as_deref()?;
        let hour: u32 = time.split(':').next()?.parse().ok()?;
        (hour < 24).then_some(hour)
    }
}
