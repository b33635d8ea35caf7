// ABOUTME: Read-only access to journal entries for analytics and grounding
// ABOUTME: Entry CRUD lives in the journaling layer; this side only queries
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

use crate::errors::{AppError, AppResult};
use crate::models::{Feeling, LogEntry};
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Read-only journal entry queries
pub struct EntryManager {
    pool: SqlitePool,
}

impl EntryManager {
    /// Create a new entry manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch a user's entries in `[start, end]`, ordered by date then time
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or a stored row is
    /// malformed
    pub async fn list_entries(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<LogEntry>> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, entry_date, entry_time, duration_minutes,
                   category, feeling, notes, is_absence_marker
            FROM log_entries
            WHERE user_id = $1 AND entry_date >= $2 AND entry_date <= $3
            ORDER BY entry_date ASC, entry_time ASC
            ",
        )
        .bind(user_id.to_string())
        .bind(start.to_string())
        .bind(end.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list entries: {e}")))?;

        rows.into_iter().map(Self::entry_from_row).collect()
    }

    fn entry_from_row(r: sqlx::sqlite::SqliteRow) -> AppResult<LogEntry> {
        let user_id: String = r.get("user_id");
        let user_id = Uuid::parse_str(&user_id)
            .map_err(|e| AppError::database(format!("Malformed user id in entry row: {e}")))?;

        let entry_date: String = r.get("entry_date");
        let entry_date = entry_date
            .parse::<NaiveDate>()
            .map_err(|e| AppError::database(format!("Malformed entry date: {e}")))?;

        let category: Option<i64> = r.get("category");
        let feeling: Option<String> = r.get("feeling");

        Ok(LogEntry {
            id: r.get("id"),
            user_id,
            entry_date,
            entry_time: r.get("entry_time"),
            duration_minutes: r.get("duration_minutes"),
            category: category.and_then(|c| u8::try_from(c).ok()),
            feeling: feeling.as_deref().and_then(Feeling::parse),
            notes: r.get("notes"),
            is_absence_marker: r.get("is_absence_marker"),
        })
    }
}

/// Render entries as compact grounding text for the model system prompt
///
/// One line per entry, omitting fields the entry does not carry. Absence
/// markers are skipped; they mean nothing to the model.
#[must_use]
pub fn render_entries_context(entries: &[LogEntry]) -> String {
    let mut lines = vec!["User's journal entries in the selected time range:".to_owned()];
    for entry in entries.iter().filter(|e| !e.is_absence_marker) {
        let mut line = format!("- Date: {}", entry.entry_date);
        if let Some(time) = &entry.entry_time {
            line.push_str(&format!(" Time: {time}"));
        }
        if let Some(duration) = entry.duration_minutes {
            line.push_str(&format!(" Duration: {duration}min"));
        }
        if let Some(category) = entry.category {
            line.push_str(&format!(" Category: {category}"));
        }
        if let Some(feeling) = entry.feeling {
            line.push_str(&format!(" Feeling: {}", feeling.as_str()));
        }
        if let Some(notes) = &entry.notes {
            line.push_str(&format!(" Notes: {notes}"));
        }
        lines.push(line);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_util::memory_pool;

    async fn seed_entry(
        pool: &SqlitePool,
        user_id: Uuid,
        date: &str,
        time: Option<&str>,
        absence: bool,
    ) {
        sqlx::query(
            r"
            INSERT INTO log_entries (id, user_id, entry_date, entry_time, duration_minutes,
                                     category, feeling, notes, is_absence_marker)
            VALUES ($1, $2, $3, $4, 8, 4, 'smooth', NULL, $5)
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(date)
        .bind(time)
        .bind(absence)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_list_entries_filters_by_user_and_range() {
        let pool = memory_pool().await;
        let manager = EntryManager::new(pool.clone());
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();

        seed_entry(&pool, user, "2025-03-02", Some("07:00"), false).await;
        seed_entry(&pool, user, "2025-03-01", Some("08:00"), false).await;
        seed_entry(&pool, user, "2025-02-01", None, false).await;
        seed_entry(&pool, other, "2025-03-02", None, false).await;

        let entries = manager
            .list_entries(user, "2025-03-01".parse().unwrap(), "2025-03-07".parse().unwrap())
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entry_date.to_string(), "2025-03-01");
        assert_eq!(entries[1].entry_date.to_string(), "2025-03-02");
        assert_eq!(entries[0].feeling, Some(Feeling::Smooth));
    }

    #[tokio::test]
    async fn test_render_context_skips_absence_markers() {
        let pool = memory_pool().await;
        let manager = EntryManager::new(pool.clone());
        let user = Uuid::new_v4();

        seed_entry(&pool, user, "2025-03-01", Some("07:30"), false).await;
        seed_entry(&pool, user, "2025-03-02", None, true).await;

        let entries = manager
            .list_entries(user, "2025-03-01".parse().unwrap(), "2025-03-07".parse().unwrap())
            .await
            .unwrap();
        let context = render_entries_context(&entries);

        assert!(context.contains("- Date: 2025-03-01 Time: 07:30 Duration: 8min Category: 4 Feeling: smooth"));
        assert!(!context.contains("2025-03-02"));
    }
}
