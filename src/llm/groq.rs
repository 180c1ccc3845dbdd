//! Groq API 客户端（OpenAI 兼容格式）
//!
//! Groq 提供与 OpenAI 兼容的 API 接口。
//! - Base URL: https://api.groq.com/openai/v1
//! - 默认模型: mixtral-8x7b-32768

use crate::llm::OpenAiClient;

/// Groq API 常量
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";
pub const GROQ_MIXTRAL: &str = "mixtral-8x7b-32768";

/// 创建 Groq 客户端
///
/// - 密钥取自环境变量 `GROQ_API_KEY`，缺失时不报错，调用时由服务端返回鉴权失败
/// - 模型缺省为 `mixtral-8x7b-32768`
pub fn create_groq_client(model: Option<&str>, api_key: Option<&str>) -> OpenAiClient {
    let api_key = api_key
        .map(String::from)
        .or_else(|| std::env::var(GROQ_API_KEY_ENV).ok())
        .unwrap_or_default();

    OpenAiClient::new(
        Some(GROQ_BASE_URL),
        model.unwrap_or(GROQ_MIXTRAL),
        Some(api_key.as_str()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_is_mixtral() {
        let client = create_groq_client(None, Some("gsk-test"));
        assert_eq!(client.model(), GROQ_MIXTRAL);
    }

    #[test]
    fn test_explicit_model_wins() {
        let client = create_groq_client(Some("llama3-8b-8192"), Some("gsk-test"));
        assert_eq!(client.model(), "llama3-8b-8192");
    }
}
