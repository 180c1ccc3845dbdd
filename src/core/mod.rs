//! 核心编排层：终端会话的命令循环与 UI 状态投影

pub mod orchestrator;
pub mod state;

pub use orchestrator::{create_shell, spawn_shell, Command};
pub use state::{ShellPhase, UiState};
