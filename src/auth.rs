// ABOUTME: Request identity resolution from bearer session tokens
// ABOUTME: Narrow seam over the excluded credential-issuance layer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

//! # Identity Resolution
//!
//! Credential issuance and verification belong to the surrounding auth layer;
//! this crate only needs "which user is this request". The [`IdentityResolver`]
//! trait is the seam: production resolves opaque bearer tokens against the
//! sessions table, tests substitute a fixed identity.

use async_trait::async_trait;
use axum::http::HeaderMap;
use uuid::Uuid;

use crate::database::UserManager;
use crate::errors::{AppError, AppResult};

/// Resolves the authenticated user for a request
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve a bearer token to a user id
    ///
    /// # Errors
    ///
    /// Returns an auth error when the token is unknown, or a database error
    /// if the lookup fails.
    async fn resolve(&self, token: &str) -> AppResult<Uuid>;
}

/// Production resolver backed by the sessions table
pub struct SessionIdentityResolver {
    users: UserManager,
}

impl SessionIdentityResolver {
    /// Create a resolver over the given user manager
    #[must_use]
    pub const fn new(users: UserManager) -> Self {
        Self { users }
    }
}

#[async_trait]
impl IdentityResolver for SessionIdentityResolver {
    async fn resolve(&self, token: &str) -> AppResult<Uuid> {
        self.users
            .find_user_by_session(token)
            .await?
            .ok_or_else(|| AppError::auth_invalid("Unknown session token"))
    }
}

/// Extract the bearer token from an Authorization header
///
/// # Errors
///
/// Returns an auth-required error when the header is missing or not a bearer
/// scheme.
pub fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or_else(AppError::auth_required)
}
