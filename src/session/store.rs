//! 会话对象与会话表
//!
//! 生命周期：会话开始时创建，每轮追加，会话结束时销毁。
//! 一轮对话在会话锁内完成：先跑完流水线，再一次性追加 user 与 assistant 两条消息，
//! 因此并发提交到同一会话时两条消息总是相邻。
//! 超过空闲时长未活动的会话由 `cleanup_expired` 回收。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::pipeline::{Pipeline, PipelineError};
use crate::session::Transcript;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("message is empty")]
    EmptyInput,
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// 单个会话：id、最近活动时间与只追加的会话记录
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    last_active: Instant,
    transcript: Transcript,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            last_active: Instant::now(),
            transcript: Transcript::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// 刷新最近活动时间
    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    /// 空闲超过 `ttl` 即视为过期
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.last_active.elapsed() > ttl
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// 处理一轮用户输入，返回助手回复
    pub async fn submit(&mut self, pipeline: &Pipeline, input: &str) -> Result<String, SessionError> {
        self.submit_with_cancel(pipeline, input, &CancellationToken::new())
            .await
    }

    pub async fn submit_with_cancel(
        &mut self,
        pipeline: &Pipeline,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<String, SessionError> {
        self.touch();
        if input.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }

        let state = pipeline.invoke_with_cancel(input, cancel).await?;

        self.transcript.push_user(input);
        self.transcript.push_assistant(state.final_output.clone());
        self.touch();
        tracing::info!(
            session = %self.id,
            turns = self.transcript.len() / 2,
            "turn completed"
        );
        Ok(state.final_output)
    }
}

/// 会话表：id -> 会话（每个会话各自加锁）
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Arc<Mutex<Session>>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取已有会话；id 为空或不存在时新建（沿用给定 id，未给则生成 uuid）
    pub async fn get_or_create(&self, id: Option<&str>) -> Arc<Mutex<Session>> {
        let id = id.filter(|s| !s.is_empty());
        if let Some(id) = id {
            if let Some(session) = self.sessions.read().await.get(id) {
                return Arc::clone(session);
            }
        }

        let session = match id {
            Some(id) => Session::with_id(id),
            None => Session::new(),
        };
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .entry(session.id().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(session)));
        Arc::clone(entry)
    }

    /// 取已有会话，不新建
    pub async fn get(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// 结束会话；返回是否存在
    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::info!(session = %id, "session destroyed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// 回收空闲超过 `ttl` 的会话，返回回收数量。
    /// 正在处理一轮对话的会话（锁被占用）不回收。
    pub async fn cleanup_expired(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, session)| {
                session
                    .try_lock()
                    .map(|s| s.is_expired(ttl))
                    .unwrap_or(false)
            })
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            sessions.remove(id);
            tracing::info!(session = %id, "session expired");
        }
        expired.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::session::Role;

    #[tokio::test]
    async fn test_submit_appends_user_then_assistant() {
        let pipeline = Pipeline::new(Arc::new(MockLlmClient::replying("30-day returns.")));
        let mut session = Session::new();
        let reply = session
            .submit(&pipeline, "What is your return policy?")
            .await
            .unwrap();

        assert_eq!(reply, "30-day returns.");
        let messages = session.transcript().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "What is your return policy?");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "30-day returns.");
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected_without_append() {
        let pipeline = Pipeline::new(Arc::new(MockLlmClient::new()));
        let mut session = Session::new();
        assert_eq!(
            session.submit(&pipeline, "  ").await,
            Err(SessionError::EmptyInput)
        );
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_store_reuses_and_removes_sessions() {
        let store = SessionStore::new();
        let a = store.get_or_create(Some("abc")).await;
        let b = store.get_or_create(Some("abc")).await;
        assert!(Arc::ptr_eq(&a, &b));

        let fresh = store.get_or_create(None).await;
        assert_ne!(fresh.lock().await.id(), "abc");
        assert_eq!(store.len().await, 2);

        assert!(store.remove("abc").await);
        assert!(!store.remove("abc").await);
        assert!(store.get("abc").await.is_none());
    }

    #[tokio::test]
    async fn test_cleanup_expired_removes_idle_sessions() {
        let store = SessionStore::new();
        store.get_or_create(Some("idle")).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        store.get_or_create(Some("fresh")).await;

        let removed = store.cleanup_expired(Duration::from_millis(40)).await;
        assert_eq!(removed, 1);
        assert!(store.get("idle").await.is_none());
        assert!(store.get("fresh").await.is_some());
    }

    #[tokio::test]
    async fn test_cleanup_skips_session_with_turn_in_flight() {
        let store = SessionStore::new();
        let busy = store.get_or_create(Some("busy")).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        let guard = busy.lock().await;
        assert_eq!(store.cleanup_expired(Duration::from_millis(10)).await, 0);
        drop(guard);
        assert_eq!(store.cleanup_expired(Duration::from_millis(10)).await, 1);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_submit_refreshes_activity() {
        let pipeline = Pipeline::new(Arc::new(MockLlmClient::new()));
        let mut session = Session::new();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(session.is_expired(Duration::from_millis(10)));

        session.submit(&pipeline, "hello").await.unwrap();
        assert!(!session.is_expired(Duration::from_secs(5)));
    }
}
