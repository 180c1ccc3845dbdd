//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Groq / Mock）

pub mod groq;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::AppConfig;

pub use groq::{create_groq_client, GROQ_API_KEY_ENV, GROQ_BASE_URL, GROQ_MIXTRAL};
pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use traits::{LlmClient, LlmError};

/// 根据配置选择 LLM 后端（groq / openai / mock）
///
/// 只在启动时读取密钥，不做校验：缺失或无效的密钥会在第一次补全调用时以错误文本呈现给用户。
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let key_env = cfg.llm.api_key_env.clone().unwrap_or_else(|| match provider.as_str() {
        "openai" => "OPENAI_API_KEY".to_string(),
        _ => GROQ_API_KEY_ENV.to_string(),
    });
    let api_key = std::env::var(&key_env).ok();

    match provider.as_str() {
        "mock" => {
            tracing::info!("Using Mock LLM");
            Arc::new(MockLlmClient::new())
        }
        "openai" => {
            if api_key.is_none() {
                tracing::warn!("{} is not set; completion calls will fail", key_env);
            }
            tracing::info!("Using OpenAI-compatible LLM ({})", cfg.llm.model);
            Arc::new(
                OpenAiClient::new(
                    cfg.llm.base_url.as_deref(),
                    &cfg.llm.model,
                    Some(api_key.unwrap_or_default().as_str()),
                )
                .with_temperature(cfg.llm.temperature),
            )
        }
        other => {
            if other != "groq" {
                tracing::warn!("Unknown LLM provider '{}', falling back to groq", other);
            }
            if api_key.is_none() {
                tracing::warn!("{} is not set; completion calls will fail", key_env);
            }
            tracing::info!("Using Groq LLM ({})", cfg.llm.model);
            let client = match cfg.llm.base_url.as_deref() {
                Some(base) => OpenAiClient::new(
                    Some(base),
                    &cfg.llm.model,
                    Some(api_key.unwrap_or_default().as_str()),
                ),
                None => create_groq_client(Some(cfg.llm.model.as_str()), api_key.as_deref()),
            };
            Arc::new(client.with_temperature(cfg.llm.temperature))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_provider_selected() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "Mock".to_string();
        let llm = create_llm_from_config(&cfg);
        assert_eq!(llm.name(), "mock");
    }

    #[test]
    fn test_groq_provider_uses_configured_model() {
        let mut cfg = AppConfig::default();
        cfg.llm.model = "llama3-70b-8192".to_string();
        let llm = create_llm_from_config(&cfg);
        assert_eq!(llm.name(), "llama3-70b-8192");
    }

    #[tokio::test]
    async fn test_missing_api_key_surfaces_as_error_reply() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "openai".to_string();
        cfg.llm.api_key_env = Some("HELPDESK_TEST_KEY_NEVER_SET".to_string());
        // 本地不可达端点：请求必然失败，不出网
        cfg.llm.base_url = Some("http://127.0.0.1:9/v1".to_string());
        cfg.llm.timeouts.request = 5;

        let pipeline = crate::pipeline::Pipeline::from_config(&cfg);
        let state = pipeline.invoke("hello").await.unwrap();
        assert!(
            state.final_output.starts_with("Error: "),
            "got {:?}",
            state.final_output
        );
    }
}
