//! TUI 应用主循环
//!
//! 进入全屏/原始模式，轮询 state_rx 与键盘事件，将用户输入与快捷键转为 Command 发送给编排器，
//! 每帧用 draw 渲染 UiState 与输入缓冲。

use std::io::{self, Stdout};

use crossterm::event::KeyCode;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{mpsc, watch};

use crate::core::{Command, UiState};
use crate::ui::event::{AppEvent, EventHandler};
use crate::ui::render::draw;

fn is_exit_word(input: &str) -> bool {
    matches!(
        input.trim().to_lowercase().as_str(),
        "/exit" | "exit" | "/quit" | "quit"
    )
}

/// 回车时对输入缓冲的处理结果
#[derive(Debug, PartialEq, Eq)]
enum EnterAction {
    Ignore,
    Exit,
    Submit(String),
}

/// 取走输入缓冲：空白与退出词只按 trim 判断，提交的是原文
fn take_submission(buffer: &mut String) -> EnterAction {
    let input = std::mem::take(buffer);
    if input.trim().is_empty() {
        EnterAction::Ignore
    } else if is_exit_word(&input) {
        EnterAction::Exit
    } else {
        EnterAction::Submit(input)
    }
}

/// 运行 TUI：启用原始模式与全屏，循环 poll 事件 + 渲染，退出时恢复终端
pub async fn run_app(
    state_rx: watch::Receiver<UiState>,
    cmd_tx: mpsc::UnboundedSender<Command>,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, state_rx, cmd_tx).await;

    restore_terminal(&mut terminal)?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    state_rx: watch::Receiver<UiState>,
    cmd_tx: mpsc::UnboundedSender<Command>,
) -> anyhow::Result<()> {
    let event_handler = EventHandler::new(cmd_tx);
    let mut input_buffer = String::new();
    let mut conversation_scroll = 0usize;
    let mut last_history_len = 0usize;

    loop {
        let state = state_rx.borrow().clone();

        let shown = state.history.len() + usize::from(state.pending_input.is_some());
        if shown != last_history_len {
            last_history_len = shown;
            conversation_scroll = usize::MAX;
        }

        if let Some(ev) = event_handler.poll()? {
            match ev {
                AppEvent::Command(Command::Quit) => break,
                AppEvent::Command(_) => {}
                AppEvent::Key(key) => match key.code {
                    KeyCode::Enter if !state.input_locked => {
                        match take_submission(&mut input_buffer) {
                            EnterAction::Exit => {
                                event_handler.send(Command::Quit);
                                break;
                            }
                            EnterAction::Submit(input) => event_handler.send_submit(input),
                            EnterAction::Ignore => {}
                        }
                    }
                    KeyCode::Backspace if !state.input_locked => {
                        input_buffer.pop();
                    }
                    KeyCode::Char(c) if !state.input_locked => {
                        input_buffer.push(c);
                    }
                    KeyCode::Up => {
                        conversation_scroll = conversation_scroll.saturating_sub(1);
                    }
                    KeyCode::Down => {
                        conversation_scroll = conversation_scroll.saturating_add(1);
                    }
                    KeyCode::PageUp => {
                        conversation_scroll = conversation_scroll.saturating_sub(10);
                    }
                    KeyCode::PageDown => {
                        conversation_scroll = conversation_scroll.saturating_add(10);
                    }
                    KeyCode::Home => {
                        conversation_scroll = 0;
                    }
                    KeyCode::End => {
                        conversation_scroll = usize::MAX;
                    }
                    _ => {}
                },
            }
        }

        let mut scroll_info = (0usize, 0usize);
        terminal.draw(|f| {
            draw(f, &state, &input_buffer, conversation_scroll, &mut scroll_info);
        })?;
        let (total_lines, viewport_height) = scroll_info;
        conversation_scroll = conversation_scroll.min(total_lines.saturating_sub(viewport_height));

        tokio::task::yield_now().await;
    }

    Ok(())
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_words() {
        assert!(is_exit_word("/quit"));
        assert!(is_exit_word("EXIT"));
        assert!(!is_exit_word("how do I exit the return flow?"));
    }

    #[test]
    fn test_enter_submits_raw_buffer() {
        let mut buffer = "  where is my order?  ".to_string();
        assert_eq!(
            take_submission(&mut buffer),
            EnterAction::Submit("  where is my order?  ".to_string())
        );
        assert!(buffer.is_empty());

        let mut blank = "   ".to_string();
        assert_eq!(take_submission(&mut blank), EnterAction::Ignore);

        let mut exit = " /quit ".to_string();
        assert_eq!(take_submission(&mut exit), EnterAction::Exit);
    }
}
