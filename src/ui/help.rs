use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::config::ThemeConfig;

/// What the next key press means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    /// After the multi-message prefix.
    Multi,
    /// After the next-thread prefix.
    NextThread,
    Search,
    Tags,
}

pub fn render_help(
    f: &mut Frame,
    area: Rect,
    mode: Mode,
    status: Option<&str>,
    input: Option<&str>,
    theme: &ThemeConfig,
) {
    let key_style = Style::default().fg(theme.primary());
    let text_style = Style::default().fg(theme.fg_subtle());
    let input_style = Style::default().fg(theme.fg());
    let cursor_style = Style::default().fg(theme.primary());
    let prefix_style = Style::default().fg(theme.secondary());

    let help_text = match mode {
        Mode::Search | Mode::Tags => vec![
            Span::styled(if mode == Mode::Search { "/" } else { "tags:" }, key_style),
            Span::raw(" "),
            Span::styled(input.unwrap_or(""), input_style),
            Span::styled("_", cursor_style),
            Span::styled("  ", text_style),
            Span::styled("Enter", key_style),
            Span::styled(" confirm  ", text_style),
            Span::styled("Esc", key_style),
            Span::styled(" cancel", text_style),
        ],
        Mode::Normal => vec![
            Span::styled("j/k", key_style),
            Span::styled(" element  ", text_style),
            Span::styled("J/K", key_style),
            Span::styled(" message  ", text_style),
            Span::styled("Enter", key_style),
            Span::styled(" open  ", text_style),
            Span::styled("t", key_style),
            Span::styled(" mark  ", text_style),
            Span::styled("N", key_style),
            Span::styled(" unread  ", text_style),
            Span::styled("*", key_style),
            Span::styled(" flag  ", text_style),
            Span::styled("/", key_style),
            Span::styled(" search  ", text_style),
            Span::styled(";", key_style),
            Span::styled(" marked  ", text_style),
            Span::styled(":", key_style),
            Span::styled(" thread  ", text_style),
            Span::styled("q", key_style),
            Span::styled(" close", text_style),
        ],
        Mode::Multi => vec![
            Span::styled(";", prefix_style),
            Span::styled("  ", text_style),
            Span::styled("t", key_style),
            Span::styled(" unmark  ", text_style),
            Span::styled("+", key_style),
            Span::styled(" tag  ", text_style),
            Span::styled("y/Y", key_style),
            Span::styled(" yank  ", text_style),
            Span::styled("C-y", key_style),
            Span::styled(" ids  ", text_style),
            Span::styled("s", key_style),
            Span::styled(" save  ", text_style),
            Span::styled("p", key_style),
            Span::styled(" print", text_style),
        ],
        Mode::NextThread => vec![
            Span::styled(":", prefix_style),
            Span::styled("  ", text_style),
            Span::styled("a/A/x", key_style),
            Span::styled(" archive+next/unread/close  ", text_style),
            Span::styled("j/k", key_style),
            Span::styled(" next/prev  ", text_style),
            Span::styled("J/K", key_style),
            Span::styled(" next/prev unread", text_style),
        ],
    };

    let mut line = Line::from(help_text);

    // Add status message if present
    if let Some(msg) = status {
        line.spans
            .push(Span::styled("  │  ", Style::default().fg(theme.border())));
        let color = if msg.starts_with("Error") {
            theme.error()
        } else {
            theme.success()
        };
        line.spans.push(Span::styled(msg, Style::default().fg(color)));
    }

    let paragraph = Paragraph::new(line).style(Style::default().bg(theme.bg_panel()));

    f.render_widget(paragraph, area);
}
