//! 界面渲染
//!
//! 根据 UiState（phase、history、pending_input、error）与 input_buffer 绘制：标题栏显示阶段，
//! 主体为会话记录（按角色着色、按宽度换行，最旧在前），底部为输入框与快捷键提示。

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};

use crate::core::{ShellPhase, UiState};
use crate::session::Role;

/// 将内容按宽度换行，支持 UTF-8（按字符数，避免在 UTF-8 中间截断）
fn wrap_text(s: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    for para in s.split('\n') {
        let mut line = String::new();
        for ch in para.chars() {
            if line.chars().count() >= width {
                lines.push(std::mem::take(&mut line));
            }
            line.push(ch);
        }
        lines.push(line);
    }
    lines
}

fn role_style(role: Role) -> (&'static str, Color) {
    match role {
        Role::User => ("You ", Color::Cyan),
        Role::Assistant => ("Bot ", Color::Green),
    }
}

fn push_entry(lines: &mut Vec<Line<'static>>, role: Role, content: &str, width: usize) {
    if !lines.is_empty() {
        lines.push(Line::from(Span::raw("")));
    }
    let (prefix, color) = role_style(role);
    for (i, line) in wrap_text(content, width).into_iter().enumerate() {
        let pref = if i == 0 { prefix } else { "    " };
        lines.push(Line::from(vec![
            Span::styled(pref, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::raw(line),
        ]));
    }
}

/// 会话记录 + 待回复输入转成显示行
fn transcript_lines(state: &UiState, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for m in &state.history {
        push_entry(&mut lines, m.role, &m.content, width);
    }
    if let Some(pending) = &state.pending_input {
        push_entry(&mut lines, Role::User, pending, width);
        lines.push(Line::from(Span::styled(
            "    …",
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines
}

/// 输入框标题：错误 > 等待回复 > 配置的输入提示
fn input_title(state: &UiState) -> String {
    if let Some(err) = &state.error_message {
        format!(" 错误: {} ", err.chars().take(48).collect::<String>())
    } else if state.input_locked {
        " 等待回复… ".to_string()
    } else {
        format!(" {} ", state.input_placeholder)
    }
}

/// 绘制一帧：上方对话区（标题 + 历史 + 滚动条），下方输入区；将 (总行数, 可视高度) 写入 out 供外部 clamp 滚动
pub fn draw(
    f: &mut Frame,
    state: &UiState,
    input_buffer: &str,
    conversation_scroll: usize,
    out: &mut (usize, usize),
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3)])
        .split(f.area());

    let conv_area = chunks[0];
    let content_width = conv_area.width.saturating_sub(2).saturating_sub(1) as usize; // 边框 + 滚动条

    let phase_str = match state.phase {
        ShellPhase::Idle => "空闲",
        ShellPhase::Thinking => "思考中…",
        ShellPhase::Cancelling => "取消中…",
        ShellPhase::Error => "错误",
    };

    let block = Block::default()
        .title(format!(" {} │ {} ", state.title, phase_str))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let text_lines = transcript_lines(state, content_width.max(20));

    let content_height = conv_area.height.saturating_sub(2) as usize; // 边框
    let total_lines = text_lines.len();
    let max_scroll = total_lines.saturating_sub(content_height);
    let scroll_offset = conversation_scroll.min(max_scroll);

    let inner = block.inner(conv_area);
    let paragraph = Paragraph::new(Text::from(text_lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll_offset as u16, 0));
    f.render_widget(paragraph, conv_area);

    if total_lines > content_height {
        let mut scrollbar_state = ScrollbarState::new(total_lines)
            .position(scroll_offset)
            .viewport_content_length(content_height);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .thumb_symbol("█")
            .track_symbol(Some("░"));
        f.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
    }

    let input_prompt = input_title(state);

    let border_color = if state.error_message.is_some() {
        Color::Red
    } else {
        Color::Blue
    };

    let hint = " Enter 发送 │ ↑↓ PgUp/PgDn 滚动 │ Ctrl+C 取消 │ Ctrl+L 新会话 │ Ctrl+Q 退出 ";
    let input_block = Block::default()
        .title(input_prompt)
        .title_bottom(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let input = Paragraph::new(input_buffer)
        .block(input_block)
        .style(if state.input_locked {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        });

    f.render_widget(input, chunks[1]);

    out.0 = total_lines;
    out.1 = content_height;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Message;

    #[test]
    fn test_wrap_text_by_chars() {
        assert_eq!(wrap_text("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(wrap_text("你好世界", 2), vec!["你好", "世界"]);
        assert_eq!(wrap_text("a\n\nb", 10), vec!["a", "", "b"]);
    }

    #[test]
    fn test_pending_input_rendered_after_history() {
        let state = UiState {
            history: vec![Message::user("q1"), Message::assistant("a1")],
            pending_input: Some("q2".to_string()),
            ..UiState::default()
        };
        let lines = transcript_lines(&state, 40);
        // q1, 空行, a1, 空行, q2, 省略号
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[4].spans[1].content, "q2");
    }

    #[test]
    fn test_input_title_uses_configured_placeholder() {
        let mut state = UiState {
            input_placeholder: "How can we help?".to_string(),
            ..UiState::default()
        };
        assert_eq!(input_title(&state), " How can we help? ");

        state.input_locked = true;
        assert_eq!(input_title(&state), " 等待回复… ");
    }
}
