// ABOUTME: HTTP route assembly for the gutcheck server
// ABOUTME: Combines the chat and analysis routers behind tracing and CORS layers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

//! HTTP routes
//!
//! Every route authenticates via bearer session token and returns JSON
//! (or SSE for the streaming chat endpoint). Errors share the structured
//! body from [`crate::errors`].

pub mod analysis;
pub mod chat;

pub use analysis::AnalysisRoutes;
pub use chat::ChatRoutes;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::context::ServerResources;

/// Build the complete application router
pub fn router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .merge(ChatRoutes::routes(Arc::clone(&resources)))
        .merge(AnalysisRoutes::routes(resources))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
