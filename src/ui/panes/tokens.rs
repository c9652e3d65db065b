//! Token stream pane

use crate::grammar::Vocabulary;
use crate::interpreter::tokens::DEFAULT_CHANNEL;
use crate::interpreter::TokenStream;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

/// Render the token list with the parser's position highlighted
///
/// The list scrolls to keep the current token in view unless the pane is
/// focused, in which case `scroll_offset` is left to the user.
pub fn render_tokens_pane(
    frame: &mut Frame,
    area: Rect,
    tokens: Option<&TokenStream>,
    vocabulary: &Vocabulary,
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
        .title(" Tokens ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let Some(tokens) = tokens else {
        let paragraph = Paragraph::new("(not started)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    };

    let current = tokens.index();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    let total = tokens.tokens().len();
    if !is_focused {
        *scroll_offset = current.saturating_sub(visible_height / 2);
    }
    *scroll_offset = (*scroll_offset).min(total.saturating_sub(visible_height));

    let items: Vec<ListItem> = tokens
        .tokens()
        .iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(|token| {
            let is_current = token.index == current;
            let hidden = token.channel != DEFAULT_CHANNEL;
            let text_style = if hidden {
                Style::default().fg(DEFAULT_THEME.comment)
            } else {
                Style::default().fg(DEFAULT_THEME.literal)
            };

            let mut line = Line::from(vec![
                Span::styled(
                    if is_current { "▶ " } else { "  " },
                    Style::default().fg(DEFAULT_THEME.secondary),
                ),
                Span::styled(
                    format!("{:>3}:{:<3} ", token.line, token.column),
                    Style::default().fg(DEFAULT_THEME.comment),
                ),
                Span::styled(
                    format!("{:<12} ", vocabulary.display_name(token.token_type)),
                    Style::default().fg(DEFAULT_THEME.token_name),
                ),
                Span::styled(format!("{:?}", token.text), text_style),
            ]);
            if is_current {
                for span in &mut line.spans {
                    span.style = span.style.patch(Style::default().bg(DEFAULT_THEME.current_line_bg));
                }
            }
            ListItem::new(line)
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}
