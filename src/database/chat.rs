// ABOUTME: Database operations for model conversations and their messages
// ABOUTME: Assigns per-conversation message ordering atomically in the INSERT
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

use crate::errors::{AppError, AppResult};
use crate::llm::MessageRole;
use crate::models::ThinkingIntensity;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

// ============================================================================
// Database Record Types
// ============================================================================

/// Database representation of a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Unique conversation ID
    pub id: String,
    /// User who owns the conversation
    pub user_id: String,
    /// Title; None until the first exchange seeds one
    pub title: Option<String>,
    /// Per-conversation system prompt override
    pub system_prompt: Option<String>,
    /// Thinking intensity (persisted string form)
    pub thinking_intensity: String,
    /// When the conversation was created (RFC 3339)
    pub created_at: String,
    /// When the conversation was last updated (RFC 3339)
    pub updated_at: String,
}

impl ConversationRecord {
    /// Parsed thinking intensity; unknown values fall back to the default
    #[must_use]
    pub fn intensity(&self) -> ThinkingIntensity {
        ThinkingIntensity::parse(&self.thinking_intensity).unwrap_or_default()
    }
}

/// Database representation of a chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Unique message ID
    pub id: String,
    /// Conversation this message belongs to
    pub conversation_id: String,
    /// Position within the conversation, strictly increasing
    pub seq: i64,
    /// Role of the message sender (user, assistant)
    pub role: String,
    /// Message content
    pub content: String,
    /// When the message was created (RFC 3339)
    pub created_at: String,
}

/// Summary of a conversation for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Conversation ID
    pub id: String,
    /// Conversation title
    pub title: Option<String>,
    /// Thinking intensity (persisted string form)
    pub thinking_intensity: String,
    /// Number of messages in the conversation
    pub message_count: i64,
    /// When the conversation was created
    pub created_at: String,
    /// When the conversation was last updated
    pub updated_at: String,
}

// ============================================================================
// Chat Manager
// ============================================================================

/// Conversation and message store
///
/// Ownership checks are part of every user-facing query: a conversation id
/// from another user behaves exactly like a missing one.
pub struct ChatManager {
    pool: SqlitePool,
}

impl ChatManager {
    /// Create a new chat manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ========================================================================
    // Conversation Operations
    // ========================================================================

    /// Create a new conversation
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn create_conversation(
        &self,
        user_id: &str,
        title: Option<&str>,
        system_prompt: Option<&str>,
        thinking_intensity: Option<ThinkingIntensity>,
    ) -> AppResult<ConversationRecord> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let intensity = thinking_intensity.unwrap_or_default().as_str();

        sqlx::query(
            r"
            INSERT INTO chat_conversations (id, user_id, title, system_prompt, thinking_intensity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ",
        )
        .bind(&id)
        .bind(user_id)
        .bind(title)
        .bind(system_prompt)
        .bind(intensity)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create conversation: {e}")))?;

        Ok(ConversationRecord {
            id,
            user_id: user_id.to_owned(),
            title: title.map(ToOwned::to_owned),
            system_prompt: system_prompt.map(ToOwned::to_owned),
            thinking_intensity: intensity.to_owned(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Get a conversation by ID, scoped to its owner
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_conversation(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> AppResult<Option<ConversationRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, title, system_prompt, thinking_intensity, created_at, updated_at
            FROM chat_conversations
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get conversation: {e}")))?;

        Ok(row.map(|r| Self::conversation_from_row(&r)))
    }

    /// Get the most recently updated conversation for a user
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn latest_conversation(&self, user_id: &str) -> AppResult<Option<ConversationRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, title, system_prompt, thinking_intensity, created_at, updated_at
            FROM chat_conversations
            WHERE user_id = $1
            ORDER BY updated_at DESC
            LIMIT 1
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get latest conversation: {e}")))?;

        Ok(row.map(|r| Self::conversation_from_row(&r)))
    }

    /// List a user's conversations with message counts, most recent first
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn list_conversations(&self, user_id: &str) -> AppResult<Vec<ConversationSummary>> {
        let rows = sqlx::query(
            r"
            SELECT c.id, c.title, c.thinking_intensity, c.created_at, c.updated_at,
                   COUNT(m.id) AS message_count
            FROM chat_conversations c
            LEFT JOIN chat_messages m ON m.conversation_id = c.id
            WHERE c.user_id = $1
            GROUP BY c.id
            ORDER BY c.updated_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list conversations: {e}")))?;

        let summaries = rows
            .into_iter()
            .map(|r| ConversationSummary {
                id: r.get("id"),
                title: r.get("title"),
                thinking_intensity: r.get("thinking_intensity"),
                message_count: r.get("message_count"),
                created_at: r.get("created_at"),
                updated_at: r.get("updated_at"),
            })
            .collect();

        Ok(summaries)
    }

    /// Update conversation fields, leaving omitted ones untouched
    ///
    /// Returns false when the conversation does not exist or belongs to
    /// another user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn update_conversation(
        &self,
        conversation_id: &str,
        user_id: &str,
        title: Option<&str>,
        system_prompt: Option<&str>,
        thinking_intensity: Option<ThinkingIntensity>,
    ) -> AppResult<bool> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            r"
            UPDATE chat_conversations
            SET title = COALESCE($1, title),
                system_prompt = COALESCE($2, system_prompt),
                thinking_intensity = COALESCE($3, thinking_intensity),
                updated_at = $4
            WHERE id = $5 AND user_id = $6
            ",
        )
        .bind(title)
        .bind(system_prompt)
        .bind(thinking_intensity.map(|t| t.as_str()))
        .bind(&now)
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update conversation: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Overwrite a conversation title without touching updated_at
    ///
    /// Used by the background title task; a title landing late should not
    /// reorder the conversation list.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn set_title(&self, conversation_id: &str, title: &str) -> AppResult<()> {
        sqlx::query(
            r"
            UPDATE chat_conversations
            SET title = $1
            WHERE id = $2
            ",
        )
        .bind(title)
        .bind(conversation_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to set conversation title: {e}")))?;

        Ok(())
    }

    /// Delete a conversation and all its messages (cascade)
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn delete_conversation(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            DELETE FROM chat_conversations
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to delete conversation: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete all conversations for a user, returning how many were removed
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn delete_all_conversations(&self, user_id: &str) -> AppResult<i64> {
        let result = sqlx::query(
            r"
            DELETE FROM chat_conversations
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to delete conversations: {e}")))?;

        #[allow(clippy::cast_possible_wrap)]
        Ok(result.rows_affected() as i64)
    }

    // ========================================================================
    // Message Operations
    // ========================================================================

    /// Append a message to a conversation
    ///
    /// The sequence number is assigned inside the INSERT so concurrent
    /// appends to the same conversation can never collide or reorder; the
    /// conversation's `updated_at` is bumped in the same call.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn add_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> AppResult<MessageRecord> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let role_str = role.as_str();

        let row = sqlx::query(
            r"
            INSERT INTO chat_messages (id, conversation_id, seq, role, content, created_at)
            VALUES (
                $1, $2,
                (SELECT COALESCE(MAX(seq), 0) + 1 FROM chat_messages WHERE conversation_id = $2),
                $3, $4, $5
            )
            RETURNING seq
            ",
        )
        .bind(&id)
        .bind(conversation_id)
        .bind(role_str)
        .bind(content)
        .bind(&now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to add message: {e}")))?;

        let seq: i64 = row.get("seq");

        sqlx::query(
            r"
            UPDATE chat_conversations
            SET updated_at = $1
            WHERE id = $2
            ",
        )
        .bind(&now)
        .bind(conversation_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update conversation timestamp: {e}")))?;

        Ok(MessageRecord {
            id,
            conversation_id: conversation_id.to_owned(),
            seq,
            role: role_str.to_owned(),
            content: content.to_owned(),
            created_at: now,
        })
    }

    /// Get all messages for a conversation in sequence order
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_messages(&self, conversation_id: &str) -> AppResult<Vec<MessageRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, conversation_id, seq, role, content, created_at
            FROM chat_messages
            WHERE conversation_id = $1
            ORDER BY seq ASC
            ",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get messages: {e}")))?;

        let messages = rows
            .into_iter()
            .map(|r| MessageRecord {
                id: r.get("id"),
                conversation_id: r.get("conversation_id"),
                seq: r.get("seq"),
                role: r.get("role"),
                content: r.get("content"),
                created_at: r.get("created_at"),
            })
            .collect();

        Ok(messages)
    }

    fn conversation_from_row(r: &sqlx::sqlite::SqliteRow) -> ConversationRecord {
        ConversationRecord {
            id: r.get("id"),
            user_id: r.get("user_id"),
            title: r.get("title"),
            system_prompt: r.get("system_prompt"),
            thinking_intensity: r.get("thinking_intensity"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_util::memory_pool;

    #[tokio::test]
    async fn test_message_seq_is_strictly_increasing() {
        let manager = ChatManager::new(memory_pool().await);
        let conversation = manager
            .create_conversation("user-1", Some("test"), None, None)
            .await
            .unwrap();

        let first = manager
            .add_message(&conversation.id, MessageRole::User, "hello")
            .await
            .unwrap();
        let second = manager
            .add_message(&conversation.id, MessageRole::Assistant, "hi")
            .await
            .unwrap();
        let third = manager
            .add_message(&conversation.id, MessageRole::User, "again")
            .await
            .unwrap();

        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);
        assert_eq!(third.seq, 3);

        let messages = manager.get_messages(&conversation.id).await.unwrap();
        let seqs: Vec<i64> = messages.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant", "user"]);
    }

    #[tokio::test]
    async fn test_seq_is_per_conversation() {
        let manager = ChatManager::new(memory_pool().await);
        let a = manager
            .create_conversation("user-1", None, None, None)
            .await
            .unwrap();
        let b = manager
            .create_conversation("user-1", None, None, None)
            .await
            .unwrap();

        manager
            .add_message(&a.id, MessageRole::User, "a1")
            .await
            .unwrap();
        let b1 = manager
            .add_message(&b.id, MessageRole::User, "b1")
            .await
            .unwrap();

        assert_eq!(b1.seq, 1);
    }

    #[tokio::test]
    async fn test_conversation_is_owner_scoped() {
        let manager = ChatManager::new(memory_pool().await);
        let conversation = manager
            .create_conversation("user-1", Some("mine"), None, None)
            .await
            .unwrap();

        assert!(manager
            .get_conversation(&conversation.id, "user-2")
            .await
            .unwrap()
            .is_none());
        assert!(!manager
            .delete_conversation(&conversation.id, "user-2")
            .await
            .unwrap());
        assert!(manager
            .get_conversation(&conversation.id, "user-1")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_update_conversation_keeps_omitted_fields() {
        let manager = ChatManager::new(memory_pool().await);
        let conversation = manager
            .create_conversation("user-1", Some("old"), Some("prompt"), None)
            .await
            .unwrap();

        let updated = manager
            .update_conversation(
                &conversation.id,
                "user-1",
                Some("new"),
                None,
                Some(ThinkingIntensity::High),
            )
            .await
            .unwrap();
        assert!(updated);

        let fetched = manager
            .get_conversation(&conversation.id, "user-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.title.as_deref(), Some("new"));
        assert_eq!(fetched.system_prompt.as_deref(), Some("prompt"));
        assert_eq!(fetched.intensity(), ThinkingIntensity::High);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_messages() {
        let manager = ChatManager::new(memory_pool().await);
        let conversation = manager
            .create_conversation("user-1", None, None, None)
            .await
            .unwrap();
        manager
            .add_message(&conversation.id, MessageRole::User, "hello")
            .await
            .unwrap();

        assert!(manager
            .delete_conversation(&conversation.id, "user-1")
            .await
            .unwrap());
        let messages = manager.get_messages(&conversation.id).await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_list_conversations_counts_and_orders() {
        let manager = ChatManager::new(memory_pool().await);
        let older = manager
            .create_conversation("user-1", Some("older"), None, None)
            .await
            .unwrap();
        let newer = manager
            .create_conversation("user-1", Some("newer"), None, None)
            .await
            .unwrap();
        manager
            .add_message(&newer.id, MessageRole::User, "bump")
            .await
            .unwrap();

        let summaries = manager.list_conversations("user-1").await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, newer.id);
        assert_eq!(summaries[0].message_count, 1);
        assert_eq!(summaries[1].id, older.id);
        assert_eq!(summaries[1].message_count, 0);
    }
}
