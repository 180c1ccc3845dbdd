//! Helpdesk Web UI
//!
//! 启动: cargo run --bin helpdesk-web --features web
//! 浏览器访问 http://127.0.0.1:8501

#![cfg(feature = "web")]

use std::sync::Arc;

use anyhow::Context;
use helpdesk::config::load_config;
use helpdesk::observability;
use helpdesk::pipeline::Pipeline;
use helpdesk::web::{router, spawn_session_sweeper, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        Default::default()
    });

    let pipeline = Arc::new(Pipeline::from_config(&cfg));
    let addr = format!("{}:{}", cfg.web.host, cfg.web.effective_port());
    let ttl = cfg.web.session_ttl();

    let state = Arc::new(AppState::new(cfg, pipeline));
    let _sweeper = spawn_session_sweeper(state.sessions.clone(), ttl);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Helpdesk Web UI: http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
