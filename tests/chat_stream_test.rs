// ABOUTME: Integration tests for streaming chat turns
// ABOUTME: Covers delta ordering, fallback streaming, consumer disconnect, and SSE framing

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;
use tokio_stream::StreamExt;

use common::{GatewayScript, ScriptedGateway, TestServer};
use gutcheck::llm::prompts::FALLBACK_REPLY;
use gutcheck::services::{ChatOrchestrator, ChatStreamEvent, ChatTurnRequest};

fn turn(message: &str) -> ChatTurnRequest {
    ChatTurnRequest {
        message: message.to_owned(),
        conversation_id: None,
        grounding_start_date: None,
        grounding_end_date: None,
        system_prompt: None,
        thinking_intensity: None,
    }
}

#[tokio::test]
async fn test_stream_delivers_deltas_then_done() {
    let server =
        TestServer::start(ScriptedGateway::new(GatewayScript::chunks(&["Hel", "lo", "!"]))).await;
    let orchestrator = ChatOrchestrator::new(Arc::clone(&server.resources));

    let mut stream = orchestrator
        .process_message_stream(server.user_id, turn("hi"))
        .await
        .unwrap();

    let mut contents = Vec::new();
    let mut done = None;
    while let Some(event) = stream.next().await {
        match event {
            ChatStreamEvent::Delta { delta_content, .. } => contents.push(delta_content),
            ChatStreamEvent::Done {
                conversation_id, ..
            } => done = Some(conversation_id),
        }
    }

    assert_eq!(contents, vec!["Hel", "lo", "!"]);
    let conversation_id = done.expect("terminal event");

    // The done event is sent after persistence
    let messages = server
        .resources
        .chat
        .get_messages(&conversation_id)
        .await
        .unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role, "assistant");
    assert_eq!(messages[1].content, "Hello!");
}

#[tokio::test]
async fn test_stream_unavailable_sends_fallback() {
    let server = TestServer::start(ScriptedGateway::new(GatewayScript::Unavailable)).await;
    let orchestrator = ChatOrchestrator::new(Arc::clone(&server.resources));

    let mut stream = orchestrator
        .process_message_stream(server.user_id, turn("hi"))
        .await
        .unwrap();

    let mut contents = Vec::new();
    let mut conversation_id = None;
    while let Some(event) = stream.next().await {
        match event {
            ChatStreamEvent::Delta { delta_content, .. } => contents.push(delta_content),
            ChatStreamEvent::Done {
                conversation_id: id,
                ..
            } => conversation_id = Some(id),
        }
    }

    assert_eq!(contents, vec![FALLBACK_REPLY.to_owned()]);

    let messages = server
        .resources
        .chat
        .get_messages(&conversation_id.unwrap())
        .await
        .unwrap();
    assert_eq!(messages[1].content, FALLBACK_REPLY);
}

/// Dropping the consumer stops the turn; only delivered deltas are persisted
#[tokio::test]
async fn test_consumer_disconnect_persists_delivered_prefix() {
    let chunks: Vec<String> = (0..200).map(|i| format!("{i},")).collect();
    let chunk_refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
    let full: String = chunks.concat();

    let server =
        TestServer::start(ScriptedGateway::new(GatewayScript::chunks(&chunk_refs))).await;
    let orchestrator = ChatOrchestrator::new(Arc::clone(&server.resources));

    let mut stream = orchestrator
        .process_message_stream(server.user_id, turn("hi"))
        .await
        .unwrap();

    // Read two deltas, then walk away
    stream.next().await.unwrap();
    stream.next().await.unwrap();
    drop(stream);

    // The producer persists in the background once the send fails
    let mut persisted = None;
    for _ in 0..100 {
        let conversations = server
            .resources
            .chat
            .list_conversations(&server.user_id.to_string())
            .await
            .unwrap();
        if let Some(conversation) = conversations.first() {
            let messages = server
                .resources
                .chat
                .get_messages(&conversation.id)
                .await
                .unwrap();
            if messages.len() == 2 {
                persisted = Some(messages[1].content.clone());
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let persisted = persisted.expect("assistant message persisted after disconnect");
    assert!(!persisted.is_empty());
    assert!(persisted.len() < full.len());
    assert!(full.starts_with(&persisted));
}

#[tokio::test]
async fn test_http_stream_endpoint_emits_sse_frames() {
    let server =
        TestServer::start(ScriptedGateway::new(GatewayScript::chunks(&["a", "b"]))).await;

    let (status, body) = server
        .post("/api/chat/stream", json!({ "message": "hi" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    let raw = body.as_str().expect("SSE body is plain text");
    assert!(raw.contains("data: "));
    assert!(raw.contains("\"delta_content\":\"a\""));
    assert!(raw.contains("\"done\":true"));
}
