// ABOUTME: Library root for the gutcheck analytics and chat server
// ABOUTME: Wires statistics, scoring, persistence, the model gateway, and HTTP routes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

//! # Gutcheck Server
//!
//! Analytics and AI-conversation backend for a gut-health journal. Two jobs:
//!
//! - **Analysis**: aggregate a user's journal entries over a time window into
//!   a statistical snapshot, score it with deterministic heuristics, and keep
//!   a history of the results ([`intelligence`], [`services::analysis`]).
//! - **Chat**: run conversations with a user-configured OpenAI-compatible
//!   model endpoint, grounded in the user's journal data, with blocking and
//!   SSE streaming delivery ([`llm`], [`services::chat_orchestration`]).
//!
//! The model endpoint is treated as optional infrastructure: when it is
//! unconfigured or unreachable, chat degrades to a canned reply and analysis
//! keeps working, scored locally.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Request identity resolution from bearer session tokens
pub mod auth;
/// Server configuration from environment variables
pub mod config;
/// Shared resource bundle for request handlers
pub mod context;
/// SQLite persistence: conversations, messages, entries, settings, analyses
pub mod database;
/// Unified error handling with standard error codes
pub mod errors;
/// Statistics aggregation and heuristic scoring
pub mod intelligence;
/// Model gateway, prompts, and SSE stream parsing
pub mod llm;
/// Structured logging configuration
pub mod logging;
/// Core domain types shared across modules
pub mod models;
/// HTTP route handlers
pub mod routes;
/// Domain services: chat orchestration and the analysis pipeline
pub mod services;
