//! Status bar rendering with keybindings and session state

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Where the session is, for the indicator on the right
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    AtBreakpoint,
    Finished,
}

pub struct StatusRenderData<'a> {
    pub message: &'a str,
    pub rule_name: &'a str,
    pub token_index: usize,
    pub token_count: usize,
    pub error_count: usize,
    pub state: SessionState,
}

/// Render the status bar at the bottom
pub fn render_status_bar(frame: &mut Frame, area: Rect, data: &StatusRenderData<'_>) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let position_text = format!(
        " {} · token {}/{} ",
        data.rule_name,
        (data.token_index + 1).min(data.token_count),
        data.token_count
    );
    let has_errors = data.error_count > 0;

    let mut left_spans = vec![
        Span::styled(
            position_text,
            Style::default()
                .bg(if has_errors {
                    DEFAULT_THEME.error
                } else {
                    DEFAULT_THEME.primary
                })
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            " | ",
            Style::default()
                .bg(DEFAULT_THEME.current_line_bg)
                .fg(DEFAULT_THEME.comment),
        ),
        Span::styled(
            format!(" {} ", data.message),
            Style::default()
                .bg(DEFAULT_THEME.current_line_bg)
                .fg(DEFAULT_THEME.fg),
        ),
    ];
    if has_errors {
        left_spans.push(Span::styled(
            format!(" {} error(s) ", data.error_count),
            Style::default()
                .bg(DEFAULT_THEME.current_line_bg)
                .fg(DEFAULT_THEME.error),
        ));
    }

    let left_paragraph = Paragraph::new(Line::from(left_spans))
        .style(Style::default().bg(DEFAULT_THEME.current_line_bg))
        .alignment(Alignment::Left);
    frame.render_widget(left_paragraph, layout[0]);

    let key_style = Style::default().bg(DEFAULT_THEME.comment).fg(Color::Black);
    let desc_style = Style::default()
        .bg(DEFAULT_THEME.current_line_bg)
        .fg(DEFAULT_THEME.fg);
    let sep_style = Style::default()
        .bg(DEFAULT_THEME.current_line_bg)
        .fg(DEFAULT_THEME.comment);

    let mut right_spans = Vec::new();
    for (key, description) in [
        (" c ", " continue "),
        (" i/→ ", " in "),
        (" o ", " over "),
        (" u ", " out "),
        (" b ", " breakpoint "),
        (" r ", " restart "),
        (" q ", " quit "),
    ] {
        right_spans.push(Span::styled(key, key_style));
        right_spans.push(Span::styled(description, desc_style));
        right_spans.push(Span::styled("│", sep_style));
    }

    let (label, color) = match data.state {
        SessionState::Stopped => (" PAUSED ", DEFAULT_THEME.secondary),
        SessionState::AtBreakpoint => (" BREAK ", DEFAULT_THEME.breakpoint),
        SessionState::Finished => (" END ", DEFAULT_THEME.success),
    };
    right_spans.push(Span::styled(
        label,
        Style::default()
            .bg(color)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
    ));

    let right_paragraph = Paragraph::new(Line::from(right_spans))
        .style(Style::default().bg(DEFAULT_THEME.current_line_bg))
        .alignment(Alignment::Right);
    frame.render_widget(right_paragraph, layout[1]);
}
