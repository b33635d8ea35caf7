// ABOUTME: Shared harness for integration tests: in-memory server with a scripted gateway
// ABOUTME: Seeds sessions, settings, and journal entries behind the real router
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck
#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tower::ServiceExt;
use uuid::Uuid;

use gutcheck::auth::SessionIdentityResolver;
use gutcheck::context::ServerResources;
use gutcheck::database::{self, UserManager};
use gutcheck::llm::{
    CompletionOutcome, ModelContext, ModelGateway, ModelReply, StreamDelta, StreamOutcome,
};
use gutcheck::routes;

/// Session token seeded for the primary test user
pub const TOKEN: &str = "test-session-token";

// ============================================================================
// Scripted Gateway
// ============================================================================

/// What the scripted gateway does for every call
#[derive(Clone)]
pub enum GatewayScript {
    /// Complete with this content; streams deliver it as one delta per chunk
    Reply(Vec<String>),
    /// Behave as unconfigured/unreachable
    Unavailable,
}

impl GatewayScript {
    pub fn reply(content: &str) -> Self {
        Self::Reply(vec![content.to_owned()])
    }

    pub fn chunks(chunks: &[&str]) -> Self {
        Self::Reply(chunks.iter().map(|c| (*c).to_owned()).collect())
    }
}

/// Deterministic in-process stand-in for the model endpoint
pub struct ScriptedGateway {
    script: GatewayScript,
    title: Option<String>,
}

impl ScriptedGateway {
    pub fn new(script: GatewayScript) -> Self {
        Self {
            script,
            title: None,
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_owned());
        self
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn complete(&self, _context: &ModelContext) -> CompletionOutcome {
        match &self.script {
            GatewayScript::Reply(chunks) => CompletionOutcome::Ready(ModelReply {
                content: chunks.concat(),
                reasoning: None,
            }),
            GatewayScript::Unavailable => CompletionOutcome::Unavailable,
        }
    }

    async fn open_stream(&self, _context: &ModelContext) -> StreamOutcome {
        match &self.script {
            GatewayScript::Reply(chunks) => {
                let deltas: Vec<StreamDelta> = chunks
                    .iter()
                    .map(|c| StreamDelta {
                        content: c.clone(),
                        reasoning: String::new(),
                    })
                    .collect();
                StreamOutcome::Stream(Box::pin(tokio_stream::iter(deltas)))
            }
            GatewayScript::Unavailable => StreamOutcome::Unavailable,
        }
    }

    async fn generate_title(
        &self,
        _user_message: &str,
        _assistant_reply: &str,
        _context: &ModelContext,
    ) -> Option<String> {
        self.title.clone()
    }
}

// ============================================================================
// Test Server
// ============================================================================

/// In-memory server with one seeded user session
pub struct TestServer {
    pub pool: SqlitePool,
    pub resources: Arc<ServerResources>,
    pub app: Router,
    pub user_id: Uuid,
}

impl TestServer {
    /// Stand up a server over a fresh in-memory database
    pub async fn start(gateway: ScriptedGateway) -> Self {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(
                SqliteConnectOptions::from_str("sqlite::memory:")
                    .unwrap()
                    .foreign_keys(true),
            )
            .await
            .unwrap();
        database::init_schema(&pool).await.unwrap();

        let user_id = Uuid::new_v4();
        seed_session(&pool, TOKEN, user_id).await;

        let identity = Arc::new(SessionIdentityResolver::new(UserManager::new(pool.clone())));
        let resources = Arc::new(ServerResources::with_parts(
            pool.clone(),
            Arc::new(gateway),
            identity,
        ));
        let app = routes::router(Arc::clone(&resources));

        Self {
            pool,
            resources,
            app,
            user_id,
        }
    }

    /// Issue one request and return status plus parsed JSON body
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::String(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        };
        (status, value)
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.request("GET", path, Some(TOKEN), None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", path, Some(TOKEN), Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.request("PUT", path, Some(TOKEN), Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> (StatusCode, Value) {
        self.request("DELETE", path, Some(TOKEN), None).await
    }
}

// ============================================================================
// Seeding Helpers
// ============================================================================

pub async fn seed_session(pool: &SqlitePool, token: &str, user_id: Uuid) {
    sqlx::query("INSERT INTO sessions (token, user_id, created_at) VALUES ($1, $2, $3)")
        .bind(token)
        .bind(user_id.to_string())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(pool)
        .await
        .unwrap();
}

pub async fn seed_configured_settings(pool: &SqlitePool, user_id: Uuid, auto_title: bool) {
    sqlx::query(
        r"
        INSERT INTO user_ai_settings (user_id, api_key, base_url, model, default_system_prompt, auto_title)
        VALUES ($1, 'sk-test', 'https://api.example.com/v1', 'test-model', NULL, $2)
        ",
    )
    .bind(user_id.to_string())
    .bind(auto_title)
    .execute(pool)
    .await
    .unwrap();
}

/// Insert one journal entry row
pub async fn seed_entry(
    pool: &SqlitePool,
    user_id: Uuid,
    date: &str,
    time: Option<&str>,
    duration_minutes: Option<i64>,
    category: Option<i64>,
    feeling: Option<&str>,
) {
    sqlx::query(
        r"
        INSERT INTO log_entries (id, user_id, entry_date, entry_time, duration_minutes,
                                 category, feeling, notes, is_absence_marker)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NULL, 0)
        ",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id.to_string())
    .bind(date)
    .bind(time)
    .bind(duration_minutes)
    .bind(category)
    .bind(feeling)
    .execute(pool)
    .await
    .unwrap();
}
