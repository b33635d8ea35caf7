// ABOUTME: Conversation turn orchestration between the store and the model gateway
// ABOUTME: Handles blocking and streaming turns, fallback replies, and auto-titling
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

//! # Chat Orchestration
//!
//! One turn is a fixed pipeline: resolve the conversation, persist the user
//! message, build the model context, invoke the gateway, persist the reply,
//! and (for conversations created this turn) derive a title. The user message
//! is durable before the gateway is touched, and a gateway degradation turns
//! into the fallback reply rather than an error, so every turn ends with
//! exactly one persisted assistant message.
//!
//! Streaming turns run the invoke/persist tail in a spawned producer task
//! that forwards deltas over a bounded channel. A consumer disconnect shows
//! up as a send failure, which aborts the upstream read and persists exactly
//! the deltas the consumer received.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::ServerResources;
use crate::database::entries::render_entries_context;
use crate::database::{ConversationRecord, MessageRecord, UserAiSettings};
use crate::errors::{AppError, AppResult};
use crate::llm::prompts::{with_grounding, DEFAULT_SYSTEM_PROMPT, FALLBACK_REPLY};
use crate::llm::{
    ChatMessage, CompletionOutcome, MessageRole, ModelContext, SamplingParams, StreamOutcome,
};
use crate::models::ThinkingIntensity;

/// How many characters of the first message seed the provisional title
const TITLE_SEED_CHARS: usize = 20;

/// Buffer size of the delta channel between producer and SSE consumer
const STREAM_CHANNEL_CAPACITY: usize = 32;

/// One incoming chat turn
#[derive(Debug, Clone, Deserialize)]
pub struct ChatTurnRequest {
    /// The user's message
    pub message: String,
    /// Existing conversation to continue; a new one is created when absent
    pub conversation_id: Option<String>,
    /// First day of the entry range to ground the model in
    pub grounding_start_date: Option<String>,
    /// Last day of the entry range to ground the model in
    pub grounding_end_date: Option<String>,
    /// System prompt override for a newly created conversation
    pub system_prompt: Option<String>,
    /// Thinking intensity for a newly created conversation
    pub thinking_intensity: Option<ThinkingIntensity>,
}

/// Completed blocking turn
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurnReply {
    /// The persisted assistant message
    pub message: MessageRecord,
    /// Chain-of-thought text, when the endpoint exposed it (not persisted)
    pub reasoning: Option<String>,
}

/// One event on the streaming channel
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ChatStreamEvent {
    /// An incremental piece of the reply
    Delta {
        delta_content: String,
        delta_reasoning: String,
        done: bool,
    },
    /// Terminal event carrying the persisted message identity
    Done {
        done: bool,
        message_id: String,
        conversation_id: String,
        created_at: String,
    },
}

/// Everything resolved before the gateway is invoked
struct TurnSetup {
    conversation: ConversationRecord,
    created_this_turn: bool,
    settings: UserAiSettings,
    context: ModelContext,
}

/// Orchestrates conversation turns against the store and the gateway
pub struct ChatOrchestrator {
    resources: Arc<ServerResources>,
}

impl ChatOrchestrator {
    /// Create an orchestrator over the shared resources
    #[must_use]
    pub const fn new(resources: Arc<ServerResources>) -> Self {
        Self { resources }
    }

    /// Run one blocking turn, returning the persisted assistant message
    ///
    /// # Errors
    ///
    /// Returns not-found for a foreign or unknown conversation id,
    /// invalid-input for a malformed grounding range, or a database error.
    /// Gateway degradation is not an error.
    pub async fn process_message(
        &self,
        user_id: Uuid,
        request: ChatTurnRequest,
    ) -> AppResult<ChatTurnReply> {
        let setup = self.prepare_turn(user_id, &request).await?;

        let (content, reasoning, degraded) =
            match self.resources.gateway.complete(&setup.context).await {
                CompletionOutcome::Ready(reply) => (reply.content, reply.reasoning, false),
                CompletionOutcome::Unavailable => {
                    info!(conversation_id = %setup.conversation.id, "Gateway unavailable, using fallback reply");
                    (FALLBACK_REPLY.to_owned(), None, true)
                }
            };

        let message = self
            .resources
            .chat
            .add_message(&setup.conversation.id, MessageRole::Assistant, &content)
            .await?;

        if !degraded {
            self.maybe_spawn_title_task(&setup, &request.message, &content);
        }

        Ok(ChatTurnReply { message, reasoning })
    }

    /// Run one streaming turn
    ///
    /// The returned stream yields delta events followed by a terminal done
    /// event. The reply is persisted by the producer task when the upstream
    /// stream ends or the consumer disconnects, whichever comes first.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::process_message`]; all of them surface
    /// before the stream starts.
    pub async fn process_message_stream(
        &self,
        user_id: Uuid,
        request: ChatTurnRequest,
    ) -> AppResult<ReceiverStream<ChatStreamEvent>> {
        let setup = self.prepare_turn(user_id, &request).await?;

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let resources = Arc::clone(&self.resources);
        let user_message = request.message.clone();

        tokio::spawn(async move {
            if let Err(e) = Self::produce_stream(&resources, setup, &user_message, &tx).await {
                warn!("Streaming turn failed after start: {e}");
            }
        });

        Ok(ReceiverStream::new(rx))
    }

    // ========================================================================
    // Pipeline Steps
    // ========================================================================

    /// Resolve the conversation, persist the user message, build the context
    async fn prepare_turn(&self, user_id: Uuid, request: &ChatTurnRequest) -> AppResult<TurnSetup> {
        let user_key = user_id.to_string();

        let (conversation, created_this_turn) = match &request.conversation_id {
            Some(id) => {
                let conversation = self
                    .resources
                    .chat
                    .get_conversation(id, &user_key)
                    .await?
                    .ok_or_else(|| AppError::not_found("Conversation"))?;
                (conversation, false)
            }
            None => {
                let seed: String = request.message.chars().take(TITLE_SEED_CHARS).collect();
                let conversation = self
                    .resources
                    .chat
                    .create_conversation(
                        &user_key,
                        Some(&seed),
                        request.system_prompt.as_deref(),
                        request.thinking_intensity,
                    )
                    .await?;
                debug!(conversation_id = %conversation.id, "Created conversation");
                (conversation, true)
            }
        };

        // The user message is durable before the gateway is touched
        self.resources
            .chat
            .add_message(&conversation.id, MessageRole::User, &request.message)
            .await?;

        let settings = self.resources.users.get_ai_settings(user_id).await?;

        let mut system_prompt = conversation
            .system_prompt
            .clone()
            .or_else(|| settings.default_system_prompt.clone())
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_owned());

        if let Some((start, end)) = Self::grounding_window(request)? {
            let entries = self.resources.entries.list_entries(user_id, start, end).await?;
            system_prompt = with_grounding(&system_prompt, &render_entries_context(&entries));
        }

        let history = self
            .resources
            .chat
            .get_messages(&conversation.id)
            .await?
            .into_iter()
            .filter_map(|m| {
                MessageRole::parse(&m.role).map(|role| ChatMessage::new(role, m.content))
            })
            .collect();

        let sampling =
            SamplingParams::for_intensity(ThinkingIntensity::parse(&conversation.thinking_intensity));

        let context = ModelContext {
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
            system_prompt,
            history,
            sampling,
        };

        Ok(TurnSetup {
            conversation,
            created_this_turn,
            settings,
            context,
        })
    }

    fn grounding_window(request: &ChatTurnRequest) -> AppResult<Option<(NaiveDate, NaiveDate)>> {
        let (Some(start), Some(end)) = (
            request.grounding_start_date.as_deref(),
            request.grounding_end_date.as_deref(),
        ) else {
            return Ok(None);
        };

        let parse = |field: &str, value: &str| {
            value.parse::<NaiveDate>().map_err(|_| {
                AppError::invalid_input(format!("Invalid {field} '{value}', expected YYYY-MM-DD"))
            })
        };
        Ok(Some((
            parse("grounding_start_date", start)?,
            parse("grounding_end_date", end)?,
        )))
    }

    /// Invoke/persist tail of a streaming turn, run in a spawned task
    async fn produce_stream(
        resources: &Arc<ServerResources>,
        setup: TurnSetup,
        user_message: &str,
        tx: &mpsc::Sender<ChatStreamEvent>,
    ) -> AppResult<()> {
        let mut accumulated = String::new();
        let mut degraded = false;

        match resources.gateway.open_stream(&setup.context).await {
            StreamOutcome::Stream(mut deltas) => {
                while let Some(delta) = deltas.next().await {
                    let event = ChatStreamEvent::Delta {
                        delta_content: delta.content.clone(),
                        delta_reasoning: delta.reasoning,
                        done: false,
                    };
                    if tx.send(event).await.is_err() {
                        // Consumer disconnected; stop reading upstream and
                        // persist only what was actually delivered
                        debug!(conversation_id = %setup.conversation.id, "Stream consumer disconnected");
                        break;
                    }
                    accumulated.push_str(&delta.content);
                }
            }
            StreamOutcome::Unavailable => {
                info!(conversation_id = %setup.conversation.id, "Gateway unavailable, streaming fallback reply");
                degraded = true;
                accumulated.push_str(FALLBACK_REPLY);
                // Best effort; the reply is persisted either way
                let _ = tx
                    .send(ChatStreamEvent::Delta {
                        delta_content: FALLBACK_REPLY.to_owned(),
                        delta_reasoning: String::new(),
                        done: false,
                    })
                    .await;
            }
        }

        let message = resources
            .chat
            .add_message(&setup.conversation.id, MessageRole::Assistant, &accumulated)
            .await?;

        if !degraded {
            Self::spawn_title_task_if_eligible(resources, &setup, user_message, &accumulated);
        }

        let _ = tx
            .send(ChatStreamEvent::Done {
                done: true,
                message_id: message.id,
                conversation_id: message.conversation_id,
                created_at: message.created_at,
            })
            .await;

        Ok(())
    }

    // ========================================================================
    // Title Derivation
    // ========================================================================

    fn maybe_spawn_title_task(&self, setup: &TurnSetup, user_message: &str, reply: &str) {
        Self::spawn_title_task_if_eligible(&self.resources, setup, user_message, reply);
    }

    /// Spawn a best-effort title generation for conversations created this turn
    ///
    /// The seed title stands unless the model produces a better one. Nothing
    /// here can fail the turn; the task owns its errors.
    fn spawn_title_task_if_eligible(
        resources: &Arc<ServerResources>,
        setup: &TurnSetup,
        user_message: &str,
        reply: &str,
    ) {
        if !setup.created_this_turn || !setup.settings.auto_title || !setup.settings.is_configured()
        {
            return;
        }

        let resources = Arc::clone(resources);
        let conversation_id = setup.conversation.id.clone();
        let context = setup.context.clone();
        let user_message = user_message.to_owned();
        let reply = reply.to_owned();

        tokio::spawn(async move {
            let Some(title) = resources
                .gateway
                .generate_title(&user_message, &reply, &context)
                .await
            else {
                debug!(conversation_id, "Title generation produced nothing, keeping seed");
                return;
            };

            match resources.chat.set_title(&conversation_id, &title).await {
                Ok(()) => debug!(conversation_id, title, "Conversation title updated"),
                Err(e) => warn!(conversation_id, "Failed to store generated title: {e}"),
            }
        });
    }
}
