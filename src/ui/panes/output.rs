//! Debugger output pane

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, Borders, List, ListItem, Padding, Paragraph},
    Frame,
};

/// A line collected from output events
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub text: String,
    pub is_error: bool,
}

/// Render the output pane
pub fn render_output_pane(
    frame: &mut Frame,
    area: Rect,
    lines: &[OutputLine],
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    let block = Block::default()
        .title(" Output ")
        .borders(Borders::ALL)
        .border_style(border_style);

    if lines.is_empty() {
        let paragraph = Paragraph::new("(no output)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let block = block.padding(Padding::new(1, 0, 0, 0));
    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    if lines.len() > visible_height {
        *scroll_offset = (*scroll_offset).min(lines.len() - visible_height);
    } else {
        *scroll_offset = 0;
    }

    let items: Vec<ListItem> = lines
        .iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(|line| {
            let color = if line.is_error {
                DEFAULT_THEME.error
            } else {
                DEFAULT_THEME.fg
            };
            ListItem::new(line.text.as_str()).style(Style::default().fg(color))
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}
