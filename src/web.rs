//! Web 界面：单页聊天 + JSON API
//!
//! 每个浏览器会话对应 SessionStore 中的一个 Session；同一会话的轮次在会话锁内串行执行。
//! 空闲超过 `[web] session_ttl` 的会话由 [`spawn_session_sweeper`] 定期回收。

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::pipeline::Pipeline;
use crate::session::{Message, SessionError, SessionStore};

pub struct AppState {
    pub config: AppConfig,
    pub pipeline: Arc<Pipeline>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: AppConfig, pipeline: Arc<Pipeline>) -> Self {
        Self {
            config,
            pipeline,
            sessions: SessionStore::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InfoResponse {
    pub title: String,
    pub page_title: String,
    pub input_placeholder: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/info", get(api_info))
        .route("/api/chat", post(api_chat))
        .route("/api/history", get(api_history))
        .route("/api/session/clear", post(api_session_clear))
        .route("/api/health", get(|| async { "OK" }))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

async fn api_info(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    Json(InfoResponse {
        title: state.config.app.title.clone(),
        page_title: state.config.app.page_title.clone(),
        input_placeholder: state.config.app.input_placeholder.clone(),
    })
}

async fn api_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    // 仅用 trim 判断空白；送入流水线与会话记录的是原文
    if req.message.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "message is required".to_string()));
    }

    let session = state.sessions.get_or_create(req.session_id.as_deref()).await;
    let mut session = session.lock().await;
    let reply = session
        .submit(&state.pipeline, &req.message)
        .await
        .map_err(|e| match e {
            SessionError::EmptyInput => (StatusCode::BAD_REQUEST, e.to_string()),
            SessionError::Pipeline(_) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        })?;

    Ok(Json(ChatResponse {
        reply,
        session_id: session.id().to_string(),
    }))
}

async fn api_history(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SessionQuery>,
) -> Result<Json<HistoryResponse>, (StatusCode, String)> {
    let session = state
        .sessions
        .get(&q.session_id)
        .await
        .ok_or((StatusCode::NOT_FOUND, "session not found".to_string()))?;
    let mut session = session.lock().await;
    session.touch();
    Ok(Json(HistoryResponse {
        session_id: session.id().to_string(),
        messages: session.transcript().messages().to_vec(),
    }))
}

async fn api_session_clear(
    State(state): State<Arc<AppState>>,
    Json(q): Json<SessionQuery>,
) -> StatusCode {
    if state.sessions.remove(&q.session_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// 按 `ttl` 周期回收空闲会话；每 `ttl` 扫描一次，最多间隔一分钟
pub fn spawn_session_sweeper(
    sessions: SessionStore,
    ttl: Duration,
) -> tokio::task::JoinHandle<()> {
    let period = ttl.min(Duration::from_secs(60));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = sessions.cleanup_expired(ttl).await;
            if removed > 0 {
                let remaining = sessions.len().await;
                tracing::info!(removed, remaining, "expired sessions swept");
            }
        }
    })
}
