//! Grammar source pane
//!
//! Shows the grammar file with light highlighting, breakpoint markers, the
//! line the debugger is stopped in and the line cursor used to toggle
//! breakpoints.
//!
//! # Rendering
//!
//! Highlighting is a character scan, not a grammar parser: quoted literals,
//! line comments, keywords, and identifiers coloured by their first letter
//! (upper case for tokens, lower case for rules).

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use rustc_hash::FxHashSet;

fn highlight_grammar_line(line: &str) -> Line<'_> {
    let mut spans = Vec::new();
    let mut current_word = String::new();
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '/' && chars.get(i + 1) == Some(&'/') {
            flush_word(&mut spans, &mut current_word);
            let rest: String = chars[i..].iter().collect();
            spans.push(Span::styled(rest, Style::default().fg(DEFAULT_THEME.comment)));
            break;
        }

        if c == '\'' {
            flush_word(&mut spans, &mut current_word);
            let mut end = i + 1;
            while end < chars.len() && chars[end] != '\'' {
                end += if chars[end] == '\\' { 2 } else { 1 };
            }
            let end = (end + 1).min(chars.len());
            let literal: String = chars[i..end].iter().collect();
            spans.push(Span::styled(literal, Style::default().fg(DEFAULT_THEME.literal)));
            i = end;
            continue;
        }

        if !c.is_alphanumeric() && c != '_' {
            flush_word(&mut spans, &mut current_word);
            let style = match c {
                ':' | ';' | '|' => Style::default().fg(DEFAULT_THEME.primary),
                '?' | '*' | '+' | '~' => Style::default().fg(DEFAULT_THEME.secondary),
                _ => Style::default().fg(DEFAULT_THEME.fg),
            };
            spans.push(Span::styled(c.to_string(), style));
            i += 1;
            continue;
        }

        current_word.push(c);
        i += 1;
    }

    flush_word(&mut spans, &mut current_word);
    Line::from(spans)
}

fn flush_word(spans: &mut Vec<Span<'_>>, word: &mut String) {
    if !word.is_empty() {
        let style = word_style(word);
        spans.push(Span::styled(std::mem::take(word), style));
    }
}

fn word_style(word: &str) -> Style {
    match word {
        "grammar" | "lexer" | "parser" | "fragment" | "options" | "tokens" | "channels"
        | "mode" | "import" | "returns" | "locals" | "EOF" => Style::default()
            .fg(DEFAULT_THEME.keyword)
            .add_modifier(Modifier::BOLD),
        _ if word.starts_with(|c: char| c.is_ascii_uppercase()) => {
            Style::default().fg(DEFAULT_THEME.token_name)
        }
        _ if word.starts_with(|c: char| c.is_ascii_lowercase()) => {
            Style::default().fg(DEFAULT_THEME.rule_name)
        }
        _ => Style::default().fg(DEFAULT_THEME.fg),
    }
}

/// Scroll state for the source pane
pub struct SourceScrollState {
    pub offset: usize,
    pub target_line_row: Option<usize>,
}

/// What the source pane shows besides the text
pub struct SourceRenderData<'a> {
    pub source_name: &'a str,
    pub source: &'a str,
    /// Line the debugger is stopped in (1-based), 0 when unknown
    pub current_line: usize,
    /// Line under the breakpoint cursor (1-based)
    pub cursor_line: usize,
    pub breakpoint_lines: &'a FxHashSet<usize>,
    pub is_focused: bool,
}

/// Render the grammar source pane
pub fn render_source_pane(
    frame: &mut Frame,
    area: Rect,
    data: &SourceRenderData<'_>,
    scroll_state: &mut SourceScrollState,
) {
    let border_style = if data.is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    let title = if data.source_name.is_empty() {
        " Grammar ".to_string()
    } else {
        format!(" {} ", data.source_name)
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    let lines: Vec<&str> = data.source.lines().collect();
    let total_lines = lines.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;

    let target_row = scroll_state
        .target_line_row
        .unwrap_or(visible_height / 2)
        .min(visible_height.saturating_sub(1));
    scroll_state.target_line_row = Some(target_row);

    // keep the focus line (cursor when the pane is focused) at the target row
    let focus_line = if data.is_focused {
        data.cursor_line
    } else {
        data.current_line
    };
    if focus_line > 0 && focus_line <= total_lines {
        scroll_state.offset = (focus_line - 1).saturating_sub(target_row);
        if total_lines > visible_height {
            scroll_state.offset = scroll_state.offset.min(total_lines - visible_height);
        } else {
            scroll_state.offset = 0;
        }
    }

    let visible_lines: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(scroll_state.offset)
        .take(visible_height)
        .map(|(idx, line)| {
            let line_num = idx + 1;
            let is_current = line_num == data.current_line;
            let is_cursor = data.is_focused && line_num == data.cursor_line;

            let marker = if data.breakpoint_lines.contains(&line_num) {
                Span::styled("●", Style::default().fg(DEFAULT_THEME.breakpoint))
            } else if is_cursor {
                Span::styled("›", Style::default().fg(DEFAULT_THEME.border_focused))
            } else {
                Span::raw(" ")
            };

            let num_style = if is_current {
                Style::default()
                    .fg(DEFAULT_THEME.secondary)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(DEFAULT_THEME.comment)
            };

            let mut content_line = highlight_grammar_line(line);
            if is_current {
                for span in &mut content_line.spans {
                    span.style = span.style.patch(Style::default().bg(DEFAULT_THEME.current_line_bg));
                }
            } else if is_cursor {
                for span in &mut content_line.spans {
                    span.style = span.style.patch(Style::default().bg(Color::Rgb(40, 40, 56)));
                }
            }

            let mut spans = vec![marker, Span::styled(format!("{:4} ", line_num), num_style)];
            spans.extend(content_line.spans);
            Line::from(spans)
        })
        .collect();

    let paragraph = if visible_lines.is_empty() {
        Paragraph::new("(no grammar source)")
            .style(Style::default().fg(DEFAULT_THEME.comment))
            .block(block)
    } else {
        Paragraph::new(visible_lines).block(block)
    };
    frame.render_widget(paragraph, area);
}
