// ABOUTME: Server binary: parses flags, opens the database, and serves the API
// ABOUTME: Command-line flags override the corresponding environment variables
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use gutcheck::config::ServerConfig;
use gutcheck::context::ServerResources;
use gutcheck::database;
use gutcheck::logging::LoggingConfig;
use gutcheck::routes;

#[derive(Parser)]
#[command(name = "gutcheck-server")]
#[command(about = "Gut-health journal analytics and AI conversation server")]
struct Args {
    /// HTTP port to listen on (overrides GUTCHECK_HTTP_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// SQLite database URL (overrides GUTCHECK_DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    LoggingConfig::from_env().init()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(database_url) = args.database_url {
        config.database_url = database_url;
    }

    let pool = database::connect(&config.database_url).await?;
    database::init_schema(&pool).await?;

    let resources = Arc::new(ServerResources::new(pool)?);
    let app = routes::router(resources);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
