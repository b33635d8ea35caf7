// ABOUTME: HTTP handlers for chat turns, conversation management, and model status
// ABOUTME: Streaming turns are delivered as Server-Sent Events over the orchestrator channel
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::auth::bearer_token;
use crate::context::ServerResources;
use crate::database::{ConversationSummary, MessageRecord};
use crate::errors::{AppError, AppResult};
use crate::models::ThinkingIntensity;
use crate::services::{ChatOrchestrator, ChatTurnRequest};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response to a blocking chat turn
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatTurnResponse {
    pub message_id: String,
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub created_at: String,
}

/// Request body for updating a conversation
#[derive(Debug, Deserialize)]
pub struct UpdateConversationRequest {
    pub title: Option<String>,
    pub system_prompt: Option<String>,
    pub thinking_intensity: Option<ThinkingIntensity>,
}

/// Response listing a user's conversations
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationSummary>,
    pub total: usize,
}

/// Messages of one conversation in sequence order
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationMessagesResponse {
    pub conversation_id: Option<String>,
    pub messages: Vec<MessageRecord>,
}

/// Model endpoint configuration status flags
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatStatusResponse {
    pub configured: bool,
    pub has_api_key: bool,
    pub has_base_url: bool,
    pub has_model: bool,
}

// ============================================================================
// Routes
// ============================================================================

/// Chat endpoints
pub struct ChatRoutes;

impl ChatRoutes {
    /// Build the chat router
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/chat", post(Self::send_message))
            .route("/api/chat/stream", post(Self::send_message_stream))
            .route("/api/chat/history", get(Self::chat_history))
            .route("/api/chat/status", get(Self::chat_status))
            .route(
                "/api/chat/conversations",
                get(Self::list_conversations).delete(Self::delete_all_conversations),
            )
            .route(
                "/api/chat/conversations/:id",
                put(Self::update_conversation).delete(Self::delete_conversation),
            )
            .route(
                "/api/chat/conversations/:id/messages",
                get(Self::conversation_messages),
            )
            .with_state(resources)
    }

    async fn authenticate(
        resources: &ServerResources,
        headers: &HeaderMap,
    ) -> AppResult<Uuid> {
        let token = bearer_token(headers)?;
        resources.identity.resolve(token).await
    }

    // ========================================================================
    // Turn Handlers
    // ========================================================================

    /// Handle POST /api/chat
    async fn send_message(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<ChatTurnRequest>,
    ) -> Result<Json<ChatTurnResponse>, AppError> {
        let user_id = Self::authenticate(&resources, &headers).await?;

        let orchestrator = ChatOrchestrator::new(Arc::clone(&resources));
        let reply = orchestrator.process_message(user_id, request).await?;

        Ok(Json(ChatTurnResponse {
            message_id: reply.message.id,
            conversation_id: reply.message.conversation_id,
            role: reply.message.role,
            content: reply.message.content,
            reasoning: reply.reasoning,
            created_at: reply.message.created_at,
        }))
    }

    /// Handle POST /api/chat/stream
    ///
    /// Each stream event is one SSE data frame of JSON; the terminal frame
    /// carries `done: true` and the persisted message identity.
    async fn send_message_stream(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<ChatTurnRequest>,
    ) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
        let user_id = Self::authenticate(&resources, &headers).await?;

        let orchestrator = ChatOrchestrator::new(Arc::clone(&resources));
        let mut events = orchestrator.process_message_stream(user_id, request).await?;

        let stream = async_stream::stream! {
            while let Some(event) = events.next().await {
                let data = serde_json::to_string(&event)
                    .unwrap_or_else(|_| json!({"done": true}).to_string());
                yield Ok(Event::default().data(data));
            }
        };

        Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
    }

    // ========================================================================
    // Conversation Handlers
    // ========================================================================

    /// Handle GET /api/chat/conversations
    async fn list_conversations(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Json<ConversationListResponse>, AppError> {
        let user_id = Self::authenticate(&resources, &headers).await?;

        let conversations = resources
            .chat
            .list_conversations(&user_id.to_string())
            .await?;
        let total = conversations.len();

        Ok(Json(ConversationListResponse {
            conversations,
            total,
        }))
    }

    /// Handle PUT /api/chat/conversations/:id
    async fn update_conversation(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(conversation_id): Path<String>,
        Json(request): Json<UpdateConversationRequest>,
    ) -> Result<Json<Value>, AppError> {
        let user_id = Self::authenticate(&resources, &headers).await?;

        let updated = resources
            .chat
            .update_conversation(
                &conversation_id,
                &user_id.to_string(),
                request.title.as_deref(),
                request.system_prompt.as_deref(),
                request.thinking_intensity,
            )
            .await?;

        if !updated {
            return Err(AppError::not_found("Conversation"));
        }

        Ok(Json(json!({ "updated": true })))
    }

    /// Handle DELETE /api/chat/conversations/:id
    async fn delete_conversation(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(conversation_id): Path<String>,
    ) -> Result<Json<Value>, AppError> {
        let user_id = Self::authenticate(&resources, &headers).await?;

        let deleted = resources
            .chat
            .delete_conversation(&conversation_id, &user_id.to_string())
            .await?;

        if !deleted {
            return Err(AppError::not_found("Conversation"));
        }

        Ok(Json(json!({ "deleted": true })))
    }

    /// Handle DELETE /api/chat/conversations
    async fn delete_all_conversations(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Json<Value>, AppError> {
        let user_id = Self::authenticate(&resources, &headers).await?;

        let deleted = resources
            .chat
            .delete_all_conversations(&user_id.to_string())
            .await?;

        Ok(Json(json!({ "deleted": deleted })))
    }

    /// Handle GET /api/chat/conversations/:id/messages
    async fn conversation_messages(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(conversation_id): Path<String>,
    ) -> Result<Json<ConversationMessagesResponse>, AppError> {
        let user_id = Self::authenticate(&resources, &headers).await?;

        let conversation = resources
            .chat
            .get_conversation(&conversation_id, &user_id.to_string())
            .await?
            .ok_or_else(|| AppError::not_found("Conversation"))?;

        let messages = resources.chat.get_messages(&conversation.id).await?;

        Ok(Json(ConversationMessagesResponse {
            conversation_id: Some(conversation.id),
            messages,
        }))
    }

    /// Handle GET /api/chat/history
    ///
    /// Returns the most recently updated conversation's messages, or an empty
    /// placeholder when the user has none. Never creates a conversation.
    async fn chat_history(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Json<ConversationMessagesResponse>, AppError> {
        let user_id = Self::authenticate(&resources, &headers).await?;

        let Some(conversation) = resources
            .chat
            .latest_conversation(&user_id.to_string())
            .await?
        else {
            return Ok(Json(ConversationMessagesResponse {
                conversation_id: None,
                messages: Vec::new(),
            }));
        };

        let messages = resources.chat.get_messages(&conversation.id).await?;

        Ok(Json(ConversationMessagesResponse {
            conversation_id: Some(conversation.id),
            messages,
        }))
    }

    // ========================================================================
    // Status Handler
    // ========================================================================

    /// Handle GET /api/chat/status
    ///
    /// Reports configuration flags only; never echoes the stored values.
    async fn chat_status(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Json<ChatStatusResponse>, AppError> {
        let user_id = Self::authenticate(&resources, &headers).await?;

        let settings = resources.users.get_ai_settings(user_id).await?;

        Ok(Json(ChatStatusResponse {
            configured: settings.is_configured(),
            has_api_key: settings.api_key.is_some(),
            has_base_url: settings.base_url.is_some(),
            has_model: settings.model.is_some(),
        }))
    }
}
