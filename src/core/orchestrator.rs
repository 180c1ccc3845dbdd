//! 会话编排器：主控循环
//!
//! 负责：加载配置、创建流水线、建立 cmd/state 两通道，并在后台任务中消费用户命令
//! （Submit/Cancel/Clear/Quit），每轮跑一次流水线并更新 UI 状态。同一时刻只处理一轮。

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{load_config, AppSection};
use crate::core::{ShellPhase, UiState};
use crate::pipeline::Pipeline;
use crate::session::Session;

/// 从 UI 发往编排器的用户命令
#[derive(Debug, Clone)]
pub enum Command {
    /// 提交用户输入，触发一轮流水线
    Submit(String),
    /// 取消当前进行中的补全
    Cancel,
    /// 结束当前会话并开始新会话
    Clear,
    /// 退出应用
    Quit,
}

/// 创建终端会话运行时：返回命令发送端与状态接收端
///
/// 配置加载失败时记录告警并使用默认配置，因此本函数不会失败。
pub fn create_shell(
    config_path: Option<PathBuf>,
) -> (mpsc::UnboundedSender<Command>, watch::Receiver<UiState>) {
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        Default::default()
    });
    let pipeline = Arc::new(Pipeline::from_config(&cfg));
    let (cmd_tx, state_rx, _handle) = spawn_shell(pipeline, cfg.app);
    (cmd_tx, state_rx)
}

/// 在后台启动编排循环
pub fn spawn_shell(
    pipeline: Arc<Pipeline>,
    app: AppSection,
) -> (
    mpsc::UnboundedSender<Command>,
    watch::Receiver<UiState>,
    JoinHandle<()>,
) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let session = Session::new();
    let (state_tx, state_rx) = watch::channel(UiState::idle(&app, &session));
    let handle = tokio::spawn(run_shell(pipeline, app, session, cmd_rx, state_tx));
    (cmd_tx, state_rx, handle)
}

async fn run_shell(
    pipeline: Arc<Pipeline>,
    app: AppSection,
    mut session: Session,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    state_tx: watch::Sender<UiState>,
) {
    tracing::info!(session = %session.id(), "session started");

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            Command::Submit(input) => {
                if input.trim().is_empty() {
                    continue;
                }
                state_tx.send_modify(|s| {
                    s.phase = ShellPhase::Thinking;
                    s.pending_input = Some(input.clone());
                    s.input_locked = true;
                    s.error_message = None;
                });

                let cancel = CancellationToken::new();
                let mut quit = false;
                let result = {
                    let turn = session.submit_with_cancel(&pipeline, &input, &cancel);
                    tokio::pin!(turn);
                    loop {
                        tokio::select! {
                            r = &mut turn => break r,
                            next = cmd_rx.recv(), if !quit => match next {
                                Some(Command::Cancel) => {
                                    cancel.cancel();
                                    state_tx.send_modify(|s| s.phase = ShellPhase::Cancelling);
                                }
                                Some(Command::Quit) | None => {
                                    cancel.cancel();
                                    quit = true;
                                }
                                Some(other) => {
                                    tracing::debug!(?other, "command ignored while a turn is running");
                                }
                            },
                        }
                    }
                };

                let mut next_state = UiState::idle(&app, &session);
                if let Err(e) = result {
                    tracing::error!(session = %session.id(), error = %e, "turn failed");
                    next_state.phase = ShellPhase::Error;
                    next_state.error_message = Some(e.to_string());
                }
                state_tx.send_replace(next_state);

                if quit {
                    break;
                }
            }
            Command::Cancel => {}
            Command::Clear => {
                tracing::info!(session = %session.id(), "session destroyed");
                session = Session::new();
                tracing::info!(session = %session.id(), "session started");
                state_tx.send_replace(UiState::idle(&app, &session));
            }
            Command::Quit => break,
        }
    }

    tracing::info!(session = %session.id(), "session ended");
}
