//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Groq / Mock）实现 LlmClient：complete 发送一组消息，返回首条回复文本或 LlmError。

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::session::Message;

/// 补全调用失败的原因；由 generate 阶段转成 `Error: <描述>` 文本
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// 网络、鉴权、配额等服务端/传输错误，原样保留描述
    #[error("{0}")]
    Api(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request cancelled")]
    Cancelled,
}

/// LLM 客户端 trait：单次非流式完成，不重试
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 后端标识（日志用）
    fn name(&self) -> &str {
        "llm"
    }
}
