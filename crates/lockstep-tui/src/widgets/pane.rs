use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthChar;

use lockstep_core::sync::{MotionKind, ScrollDirection};

use crate::app::Pane;
use crate::theme::Theme;

pub struct PaneWidget;

impl PaneWidget {
    pub fn render(
        frame: &mut Frame,
        area: Rect,
        pane: &mut Pane,
        is_focused: bool,
        show_offsets: bool,
        theme: &Theme,
    ) {
        let border_style = if !pane.is_attached() {
            Style::default().fg(theme.detached)
        } else if is_focused {
            Style::default().fg(theme.accent)
        } else {
            Style::default().fg(theme.grey0)
        };

        let mut title = vec![Span::styled(
            format!(" {} ", pane.title),
            Style::default().fg(theme.fg1).add_modifier(Modifier::BOLD),
        )];
        if show_offsets {
            title.push(Span::styled(
                format!("{} ", state_label(pane)),
                Style::default().fg(theme.yellow),
            ));
        }

        let block = Block::default()
            .title(Line::from(title))
            .borders(Borders::ALL)
            .border_style(border_style)
            .style(Style::default().bg(theme.bg0));

        let inner = block.inner(area);
        pane.set_viewport_height(inner.height);

        let width = inner.width as usize;
        let lines: Vec<Line> = pane
            .visible_lines()
            .iter()
            .map(|line| {
                Line::styled(
                    truncate_to_width(line, width),
                    Style::default().fg(theme.fg0),
                )
            })
            .collect();

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}

/// Offset, direction and motion, e.g. `12 ↓ sync`
fn state_label(pane: &Pane) -> String {
    let arrow = match pane.direction() {
        ScrollDirection::Forward => "↓",
        ScrollDirection::Reverse => "↑",
        ScrollDirection::Idle => "·",
    };
    let motion = match pane.motion() {
        None => "detached",
        Some(MotionKind::Idle) => "idle",
        Some(MotionKind::Hold) => "hold",
        Some(MotionKind::Drag) => "drag",
        Some(MotionKind::Animate) => "animate",
        Some(MotionKind::Sync) => "sync",
    };
    format!("{:.0} {} {}", pane.offset(), arrow, motion)
}

/// Cut `text` to at most `width` terminal columns
fn truncate_to_width(text: &str, width: usize) -> String {
    let mut used = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use crate::input::Action;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate_to_width("hello world", 5), "hello");
        assert_eq!(truncate_to_width("hi", 10), "hi");
        assert_eq!(truncate_to_width("hi", 0), "");
    }

    #[test]
    fn test_truncate_wide_chars() {
        // Each CJK character takes two columns
        assert_eq!(truncate_to_width("日本語", 4), "日本");
        assert_eq!(truncate_to_width("日本語", 5), "日本");
    }

    #[test]
    fn test_state_label() {
        let mut app = test_app(2, 50);
        assert_eq!(state_label(&app.panes[1]), "0 · idle");

        app.handle_action(Action::ScrollDown);
        app.handle_action(Action::ToggleAttach);
        assert_eq!(state_label(&app.panes[0]), "1 · detached");
    }
}
