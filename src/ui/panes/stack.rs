//! Call stack pane
//!
//! One entry per active rule, innermost first. Each frame shows the rule
//! name, the grammar file it comes from and the grammar symbols the
//! interpreter is currently matching.

use crate::interpreter::CallFrame;
use crate::symbols::SymbolTable;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

/// Scroll state for the stack pane
pub struct StackScrollState {
    pub offset: usize,
    pub prev_item_count: usize,
}

/// Data needed to render the stack pane
pub struct StackRenderData<'a> {
    /// Frames, outermost first
    pub frames: &'a [CallFrame],
    pub symbols: &'a dyn SymbolTable,
    /// Parser state under the cursor
    pub state: Option<usize>,
}

/// Render the call stack pane
pub fn render_stack_pane(
    frame: &mut Frame,
    area: Rect,
    data: StackRenderData<'_>,
    is_focused: bool,
    scroll_state: &mut StackScrollState,
) {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    let title = match data.state {
        Some(state) => format!(" Call Stack (state {}) ", state),
        None => " Call Stack ".to_string(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    let mut all_items = Vec::new();
    if data.frames.is_empty() {
        all_items.push(ListItem::new("(empty)").style(Style::default().fg(DEFAULT_THEME.comment)));
    }

    let innermost = data.frames.len().saturating_sub(1);
    for (depth, call_frame) in data.frames.iter().enumerate().rev() {
        let name_style = if depth == innermost {
            Style::default()
                .fg(DEFAULT_THEME.rule_name)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(DEFAULT_THEME.muted_rule)
        };

        let mut header = vec![
            Span::styled("▸ ", Style::default().fg(DEFAULT_THEME.secondary)),
            Span::styled(format!("[{}] ", depth), Style::default().fg(DEFAULT_THEME.comment)),
            Span::styled(call_frame.rule_name.clone(), name_style),
        ];
        if let Some(source) = &call_frame.source_name {
            header.push(Span::styled(
                format!("  {}", source),
                Style::default().fg(DEFAULT_THEME.comment),
            ));
        }
        all_items.push(ListItem::new(Line::from(header)));

        if !call_frame.next.is_empty() {
            let names: Vec<&str> = call_frame
                .next
                .iter()
                .map(|&symbol| data.symbols.name(symbol))
                .collect();
            all_items.push(ListItem::new(Line::from(vec![
                Span::styled("    at ", Style::default().fg(DEFAULT_THEME.comment)),
                Span::styled(names.join(" | "), Style::default().fg(DEFAULT_THEME.token_name)),
            ])));
        }
    }

    // follow the innermost frame when the stack grows
    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    let total_items = all_items.len();
    if total_items != scroll_state.prev_item_count {
        scroll_state.offset = 0;
        scroll_state.prev_item_count = total_items;
    }
    scroll_state.offset = scroll_state
        .offset
        .min(total_items.saturating_sub(visible_height));

    let visible_items: Vec<ListItem> = all_items
        .into_iter()
        .skip(scroll_state.offset)
        .take(visible_height)
        .collect();

    frame.render_widget(List::new(visible_items).block(block), area);
}
