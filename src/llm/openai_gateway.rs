// ABOUTME: Production gateway for OpenAI-compatible chat-completions endpoints
// ABOUTME: Maps every transport, status, and parse failure to the Unavailable outcome
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

//! # `OpenAI`-Compatible Gateway
//!
//! Works with any endpoint implementing the `OpenAI` chat-completions API.
//! Credentials arrive per call in [`ModelContext`]; the gateway owns only a
//! shared HTTP client. Failures never escape as errors: each one is logged
//! here and surfaced as `Unavailable` (or an early end of stream).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::sse_parser::create_delta_stream;
use super::{
    ChatMessage, CompletionOutcome, ModelContext, ModelGateway, ModelReply, StreamDelta,
    StreamOutcome,
};
use crate::errors::{AppError, AppResult};
use crate::llm::prompts::{clean_title, title_prompt, TITLE_SYSTEM_PROMPT};

/// Connection timeout for the endpoint
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Request timeout for completions and streams
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Request timeout for the short title-generation call
const TITLE_TIMEOUT_SECS: u64 = 10;

/// Sampling parameters for title generation
const TITLE_TEMPERATURE: f32 = 0.5;
const TITLE_MAX_TOKENS: u32 = 50;

// ============================================================================
// Wire Types (OpenAI-compatible format)
// ============================================================================

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

impl From<&ChatMessage> for ApiMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.as_str().to_owned(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiStreamChunk {
    choices: Vec<ApiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiStreamChoice {
    delta: ApiDelta,
}

#[derive(Debug, Deserialize)]
struct ApiDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
}

// ============================================================================
// Gateway Implementation
// ============================================================================

/// Gateway to any `OpenAI`-compatible chat-completions endpoint
pub struct OpenAiGateway {
    client: Client,
}

impl OpenAiGateway {
    /// Create the gateway with a shared HTTP client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Build the chat-completions URL from a base URL
    fn completions_url(base_url: &str) -> String {
        format!("{}/chat/completions", base_url.trim_end_matches('/'))
    }

    /// Build the message list: system prompt first, then history
    fn build_messages(context: &ModelContext) -> Vec<ApiMessage> {
        let mut messages = Vec::with_capacity(context.history.len() + 1);
        messages.push(ApiMessage {
            role: "system".to_owned(),
            content: context.system_prompt.clone(),
        });
        messages.extend(context.history.iter().map(ApiMessage::from));
        messages
    }

    /// POST a request and return the response, or `None` on any failure
    async fn post(
        &self,
        context: &ModelContext,
        request: &ApiRequest,
        timeout: Duration,
    ) -> Option<reqwest::Response> {
        // is_configured() was checked by the caller; these cannot fail here
        let base_url = context.base_url.as_deref()?;
        let api_key = context.api_key.as_deref()?;

        let response = self
            .client
            .post(Self::completions_url(base_url))
            .timeout(timeout)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => Some(response),
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!(
                    "Model API returned {status}: {}",
                    body.chars().take(200).collect::<String>()
                );
                None
            }
            Err(e) => {
                warn!("Model request failed: {e}");
                None
            }
        }
    }

    /// Parse one SSE JSON payload into a delta, skipping empty ones
    fn parse_stream_data(data: &str) -> Option<StreamDelta> {
        let chunk: ApiStreamChunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                debug!("Skipping unparseable stream chunk: {e}");
                return None;
            }
        };
        let delta = chunk.choices.into_iter().next()?.delta;
        let delta = StreamDelta {
            content: delta.content.unwrap_or_default(),
            reasoning: delta.reasoning_content.unwrap_or_default(),
        };
        (!delta.is_empty()).then_some(delta)
    }
}

#[async_trait]
impl ModelGateway for OpenAiGateway {
    #[instrument(skip(self, context), fields(model = context.model.as_deref().unwrap_or("-")))]
    async fn complete(&self, context: &ModelContext) -> CompletionOutcome {
        if !context.is_configured() {
            debug!("Model endpoint not configured, reporting unavailable");
            return CompletionOutcome::Unavailable;
        }
        let Some(model) = context.model.clone() else {
            return CompletionOutcome::Unavailable;
        };

        let request = ApiRequest {
            model,
            messages: Self::build_messages(context),
            temperature: context.sampling.temperature,
            max_tokens: context.sampling.max_tokens,
            stream: None,
        };

        let Some(response) = self
            .post(context, &request, Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .await
        else {
            return CompletionOutcome::Unavailable;
        };

        let parsed: ApiResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Failed to parse model response: {e}");
                return CompletionOutcome::Unavailable;
            }
        };

        let Some(choice) = parsed.choices.into_iter().next() else {
            warn!("Model response contained no choices");
            return CompletionOutcome::Unavailable;
        };

        match choice.message.content {
            Some(content) => CompletionOutcome::Ready(ModelReply {
                content,
                reasoning: choice.message.reasoning_content,
            }),
            None => {
                warn!("Model response contained no content");
                CompletionOutcome::Unavailable
            }
        }
    }

    #[instrument(skip(self, context), fields(model = context.model.as_deref().unwrap_or("-")))]
    async fn open_stream(&self, context: &ModelContext) -> StreamOutcome {
        if !context.is_configured() {
            debug!("Model endpoint not configured, reporting unavailable");
            return StreamOutcome::Unavailable;
        }
        let Some(model) = context.model.clone() else {
            return StreamOutcome::Unavailable;
        };

        let request = ApiRequest {
            model,
            messages: Self::build_messages(context),
            temperature: context.sampling.temperature,
            max_tokens: context.sampling.max_tokens,
            stream: Some(true),
        };

        let Some(response) = self
            .post(context, &request, Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .await
        else {
            return StreamOutcome::Unavailable;
        };

        StreamOutcome::Stream(create_delta_stream(
            response.bytes_stream(),
            Self::parse_stream_data,
        ))
    }

    async fn generate_title(
        &self,
        user_message: &str,
        assistant_reply: &str,
        context: &ModelContext,
    ) -> Option<String> {
        if !context.is_configured() {
            return None;
        }
        let model = context.model.clone()?;

        let request = ApiRequest {
            model,
            messages: vec![
                ApiMessage {
                    role: "system".to_owned(),
                    content: TITLE_SYSTEM_PROMPT.to_owned(),
                },
                ApiMessage {
                    role: "user".to_owned(),
                    content: title_prompt(user_message, assistant_reply),
                },
            ],
            temperature: TITLE_TEMPERATURE,
            max_tokens: TITLE_MAX_TOKENS,
            stream: None,
        };

        let response = self
            .post(context, &request, Duration::from_secs(TITLE_TIMEOUT_SECS))
            .await?;

        let parsed: ApiResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("Failed to parse title response: {e}");
                return None;
            }
        };

        let content = parsed.choices.into_iter().next()?.message.content?;
        clean_title(&content)
    }
}
