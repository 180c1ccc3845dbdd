//! Mock LLM 客户端（用于测试与离线演示，无需 API）
//!
//! 默认回显最后一条 User 消息；也可预设固定回复、固定错误或人为延迟，并记录收到的请求。

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError};
use crate::session::{Message, Role};

/// Mock 的应答方式
#[derive(Debug, Clone)]
enum MockBehavior {
    Echo,
    Reply(String),
    Fail(String),
}

/// Mock 客户端：可脚本化的补全结果
#[derive(Debug)]
pub struct MockLlmClient {
    behavior: MockBehavior,
    delay: Option<Duration>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self {
            behavior: MockBehavior::Echo,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次调用都返回 text
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::Reply(text.into()),
            ..Self::default()
        }
    }

    /// 每次调用都以 LlmError::Api(message) 失败
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::Fail(message.into()),
            ..Self::default()
        }
    }

    /// 应答前先等待 delay（用于超时与取消测试）
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 迄今收到的全部请求（按调用顺序）
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behavior {
            MockBehavior::Reply(text) => Ok(text.clone()),
            MockBehavior::Fail(message) => Err(LlmError::Api(message.clone())),
            MockBehavior::Echo => {
                let last_user = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.as_str())
                    .unwrap_or("(no input)");
                Ok(format!("Echo from Mock: {}", last_user))
            }
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_uses_last_user_message() {
        let client = MockLlmClient::new();
        let reply = client
            .complete(&[Message::user("first"), Message::user("second")])
            .await
            .unwrap();
        assert_eq!(reply, "Echo from Mock: second");
    }

    #[tokio::test]
    async fn test_failing_reports_message_verbatim() {
        let client = MockLlmClient::failing("boom");
        let err = client.complete(&[Message::user("hi")]).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_requests_are_recorded() {
        let client = MockLlmClient::replying("ok");
        client.complete(&[Message::user("a")]).await.unwrap();
        client.complete(&[Message::user("b")]).await.unwrap();
        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1][0].content, "b");
    }
}
