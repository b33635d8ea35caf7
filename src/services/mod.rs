// ABOUTME: Domain services sitting between the HTTP routes and the stores
// ABOUTME: Chat turn orchestration and the analysis pipeline live here
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

//! Domain services
//!
//! Routes stay thin; the multi-step flows (conversation turns, analysis runs)
//! are implemented here against the stores and the model gateway.

pub mod analysis;
pub mod chat_orchestration;

pub use analysis::{run_analysis, AnalysisOutcome, PeriodKind};
pub use chat_orchestration::{ChatOrchestrator, ChatStreamEvent, ChatTurnReply, ChatTurnRequest};
