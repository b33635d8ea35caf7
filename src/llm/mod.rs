// ABOUTME: External model gateway abstraction with graceful degradation
// ABOUTME: Defines the gateway trait, request context, and outcome sum types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

//! # External Model Gateway
//!
//! Contract for talking to an OpenAI-compatible chat-completions endpoint.
//! The central design decision is that the gateway NEVER returns an error:
//! missing credentials, transport failures, bad statuses, and unparseable
//! bodies all collapse into [`CompletionOutcome::Unavailable`] (or
//! [`StreamOutcome::Unavailable`]), which callers treat as a first-class
//! degraded branch rather than a failure. A conversation turn always
//! completes; at worst it completes with the fallback reply.
//!
//! Per-user credentials travel in [`ModelContext`]; the gateway itself holds
//! only a shared HTTP client.

mod openai_gateway;
pub mod prompts;
mod sse_parser;

pub use openai_gateway::OpenAiGateway;
pub use sse_parser::{create_delta_stream, SseEvent, SseLineBuffer};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

use crate::models::ThinkingIntensity;

// ============================================================================
// Message Types
// ============================================================================

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction message
    System,
    /// User input message
    User,
    /// Assistant response message
    Assistant,
}

impl MessageRole {
    /// Convert to string representation for API calls and persistence
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parse from the persisted string form
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// A single message in a chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a new chat message
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

// ============================================================================
// Sampling Parameters
// ============================================================================

/// Temperature and response budget for one model call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl SamplingParams {
    /// Fixed sampling table keyed by thinking intensity
    ///
    /// Low intensity runs hotter with a smaller budget; high intensity runs
    /// cooler with a larger one. No intensity at all gets the hot temperature
    /// with the medium budget.
    #[must_use]
    pub const fn for_intensity(intensity: Option<ThinkingIntensity>) -> Self {
        match intensity {
            Some(ThinkingIntensity::Low) => Self {
                temperature: 0.7,
                max_tokens: 1500,
            },
            Some(ThinkingIntensity::Medium) => Self {
                temperature: 0.5,
                max_tokens: 2000,
            },
            Some(ThinkingIntensity::High) => Self {
                temperature: 0.3,
                max_tokens: 3000,
            },
            None => Self {
                temperature: 0.7,
                max_tokens: 2000,
            },
        }
    }
}

// ============================================================================
// Request Context
// ============================================================================

/// Everything the gateway needs for one call
///
/// Credentials are per-user and resolved by the caller; the gateway holds no
/// ambient configuration.
#[derive(Debug, Clone)]
pub struct ModelContext {
    /// Bearer API key for the endpoint
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API (without `/chat/completions`)
    pub base_url: Option<String>,
    /// Model identifier
    pub model: Option<String>,
    /// Fully-built system prompt (grounding context already appended)
    pub system_prompt: String,
    /// Ordered conversation history, oldest first
    pub history: Vec<ChatMessage>,
    /// Sampling parameters for this call
    pub sampling: SamplingParams,
}

impl ModelContext {
    /// Whether key, endpoint, and model are all present
    #[must_use]
    pub fn is_configured(&self) -> bool {
        fn set(value: &Option<String>) -> bool {
            value.as_deref().is_some_and(|v| !v.is_empty())
        }
        set(&self.api_key) && set(&self.base_url) && set(&self.model)
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// A complete (non-streaming) model reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelReply {
    /// Assistant message content
    pub content: String,
    /// Chain-of-thought text, when the endpoint exposes it
    pub reasoning: Option<String>,
}

/// Result of a non-streaming completion
///
/// There is no error variant on purpose. Anything that prevents a reply is
/// `Unavailable`, and the cause is logged at the gateway boundary.
#[derive(Debug, Clone)]
pub enum CompletionOutcome {
    /// The model produced a reply
    Ready(ModelReply),
    /// No reply could be obtained; caller takes the fallback path
    Unavailable,
}

/// One increment of a streaming reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDelta {
    /// Content text added by this delta
    pub content: String,
    /// Reasoning text added by this delta
    pub reasoning: String,
}

impl StreamDelta {
    /// Whether this delta carries any text at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.reasoning.is_empty()
    }
}

/// Stream of deltas; the stream ending is the completion signal
///
/// Mid-stream failures are logged by the gateway and end the stream early.
/// Consumers cannot distinguish truncation from completion, which is the
/// point: whatever arrived is the reply.
pub type ModelStream = Pin<Box<dyn Stream<Item = StreamDelta> + Send>>;

/// Result of opening a streaming completion
pub enum StreamOutcome {
    /// The request was accepted; deltas follow
    Stream(ModelStream),
    /// No stream could be opened; caller takes the fallback path
    Unavailable,
}

// ============================================================================
// Gateway Trait
// ============================================================================

/// Gateway to an external OpenAI-compatible model endpoint
///
/// Object-safe so the orchestrator can hold `Arc<dyn ModelGateway>` and tests
/// can substitute fakes.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Perform a blocking chat completion
    async fn complete(&self, context: &ModelContext) -> CompletionOutcome;

    /// Open a streaming chat completion
    async fn open_stream(&self, context: &ModelContext) -> StreamOutcome;

    /// Generate a short conversation title from the first exchange
    ///
    /// Best-effort with a tight timeout; every failure is `None`.
    async fn generate_title(
        &self,
        user_message: &str,
        assistant_reply: &str,
        context: &ModelContext,
    ) -> Option<String>;
}
