//! 状态定义：终端界面看到的 UiState 投影
//!
//! UI 只持有轻量的 UiState（阶段、历史、待回复输入、锁、错误）；会话本身由编排器持有。

use serde::Serialize;

use crate::config::AppSection;
use crate::session::{Message, Session};

/// UI 看到的「投影」状态，轻量且易于渲染
#[derive(Clone, Debug, Serialize)]
pub struct UiState {
    pub title: String,
    /// 输入框空闲时的提示文字
    pub input_placeholder: String,
    pub phase: ShellPhase,
    pub history: Vec<Message>,
    /// 已提交、尚未得到回复的输入（会话记录在本轮结束后才追加）
    pub pending_input: Option<String>,
    pub input_locked: bool,
    pub error_message: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            title: String::new(),
            input_placeholder: String::new(),
            phase: ShellPhase::Idle,
            history: Vec::new(),
            pending_input: None,
            input_locked: false,
            error_message: None,
        }
    }
}

impl UiState {
    /// 空闲时的投影：会话记录 + 标题与输入提示
    pub fn idle(app: &AppSection, session: &Session) -> Self {
        Self {
            title: app.title.clone(),
            input_placeholder: app.input_placeholder.clone(),
            history: session.transcript().messages().to_vec(),
            ..Self::default()
        }
    }
}

/// 界面阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ShellPhase {
    Idle,
    Thinking,
    Cancelling,
    Error,
}
