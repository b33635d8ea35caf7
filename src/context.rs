// ABOUTME: Shared server resources bundled once at startup
// ABOUTME: Passed as Arc into the router and background tasks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

//! Dependency bundle for the HTTP layer
//!
//! Everything request handlers need, constructed once in the binary and
//! shared via `Arc`. Tests build the same bundle over an in-memory pool with
//! a fake gateway.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::{IdentityResolver, SessionIdentityResolver};
use crate::database::{AnalysisManager, ChatManager, EntryManager, UserManager};
use crate::errors::AppResult;
use crate::llm::{ModelGateway, OpenAiGateway};

/// Shared resources for all request handlers
pub struct ServerResources {
    /// Conversation and message store
    pub chat: ChatManager,
    /// Journal entry queries
    pub entries: EntryManager,
    /// Settings and session lookups
    pub users: UserManager,
    /// Analysis record store
    pub analysis: AnalysisManager,
    /// Gateway to the external model endpoint
    pub gateway: Arc<dyn ModelGateway>,
    /// Request identity resolution
    pub identity: Arc<dyn IdentityResolver>,
}

impl ServerResources {
    /// Build the production resource bundle over one pool
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway HTTP client cannot be created.
    pub fn new(pool: SqlitePool) -> AppResult<Self> {
        let gateway: Arc<dyn ModelGateway> = Arc::new(OpenAiGateway::new()?);
        let identity: Arc<dyn IdentityResolver> =
            Arc::new(SessionIdentityResolver::new(UserManager::new(pool.clone())));
        Ok(Self::with_parts(pool, gateway, identity))
    }

    /// Build a bundle with explicit gateway and identity implementations
    #[must_use]
    pub fn with_parts(
        pool: SqlitePool,
        gateway: Arc<dyn ModelGateway>,
        identity: Arc<dyn IdentityResolver>,
    ) -> Self {
        Self {
            chat: ChatManager::new(pool.clone()),
            entries: EntryManager::new(pool.clone()),
            users: UserManager::new(pool.clone()),
            analysis: AnalysisManager::new(pool),
            gateway,
            identity,
        }
    }
}
