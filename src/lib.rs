//! Helpdesk - Rust 客服问答助手
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 终端会话编排（命令循环、UI 状态投影）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Groq / Mock）
//! - **observability**: 日志初始化
//! - **pipeline**: 单步工作流（route → generate → finalize）
//! - **session**: 只追加的会话记录与会话表
//! - **ui**: Ratatui TUI 界面
//! - **web**: Axum Web 界面（feature `web`）

pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod pipeline;
pub mod session;
pub mod ui;
#[cfg(feature = "web")]
pub mod web;

pub use pipeline::{Pipeline, TurnState};
pub use session::{Session, SessionStore};
