//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HELPDESK__*` 覆盖（双下划线表示嵌套，如 `HELPDESK__LLM__PROVIDER=openai`）。
//! API Key 不在此处读取，见 [`crate::llm::create_llm_from_config`]。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub web: WebSection,
}

/// [app] 段：标题、浏览器页签标题与输入框提示
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub title: String,
    pub page_title: String,
    pub input_placeholder: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            title: "Amazon Customer Support Chatbot".to_string(),
            page_title: "Amazon Assistant".to_string(),
            input_placeholder: "Ask your question".to_string(),
        }
    }
}

/// [llm] 段：后端、模型、采样温度与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：groq / openai / mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    /// 0 表示贪心解码
    pub temperature: f32,
    /// 覆盖默认的密钥环境变量名（groq: GROQ_API_KEY，openai: OPENAI_API_KEY）
    pub api_key_env: Option<String>,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            model: "mixtral-8x7b-32768".to_string(),
            base_url: None,
            temperature: 0.0,
            api_key_env: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次补全请求超时（秒）
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

impl LlmSection {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.request)
    }
}

/// 覆盖 [web] port 的环境变量
pub const WEB_PORT_ENV: &str = "HELPDESK_WEB_PORT";

/// [web] 段：helpdesk-web 监听地址与会话空闲回收
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebSection {
    pub host: String,
    pub port: u16,
    /// 会话空闲多久后回收（秒）
    pub session_ttl: u64,
}

impl Default for WebSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            session_ttl: 3600,
        }
    }
}

impl WebSection {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl)
    }

    /// 实际监听端口：HELPDESK_WEB_PORT 可解析时优先
    pub fn effective_port(&self) -> u16 {
        port_override(std::env::var(WEB_PORT_ENV).ok().as_deref(), self.port)
    }
}

fn port_override(value: Option<&str>, fallback: u16) -> u16 {
    value
        .and_then(|s| s.trim().parse::<u16>().ok())
        .unwrap_or(fallback)
}

impl AppConfig {
    /// 拒绝无法使用的取值
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.llm.timeouts.request == 0 {
            return Err(config::ConfigError::Message(
                "llm.timeouts.request must be greater than 0".to_string(),
            ));
        }
        if self.web.session_ttl == 0 {
            return Err(config::ConfigError::Message(
                "web.session_ttl must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// 从 config 目录加载配置，环境变量 HELPDESK__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 HELPDESK__*（双下划线表示嵌套键）
/// 4. 校验取值，见 [`AppConfig::validate`]
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HELPDESK")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    let cfg: AppConfig = c.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}
