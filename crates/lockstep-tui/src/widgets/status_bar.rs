use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::app::App;

pub struct StatusBarWidget;

impl StatusBarWidget {
    pub fn render(frame: &mut Frame, area: Rect, app: &App) {
        let theme = &app.theme;
        let status_text = if let Some(msg) = &app.status_message {
            format!(" {}", msg)
        } else {
            summary(app)
        };

        let help_hint = " q:quit h/l:panes j/k:line ^d/^u:page gg/G:ends r:reset x:detach ";
        let padding_len = (area.width as usize)
            .saturating_sub(status_text.width() + help_hint.width());

        let line = Line::from(vec![
            Span::styled(status_text, Style::default().fg(theme.fg0).bg(theme.bg2)),
            Span::styled(" ".repeat(padding_len), Style::default().bg(theme.bg2)),
            Span::styled(help_hint, Style::default().fg(theme.grey2).bg(theme.bg2)),
        ]);

        frame.render_widget(Paragraph::new(line), area);
    }
}

fn summary(app: &App) -> String {
    let focus = app
        .focused_pane()
        .map(|pane| pane.title.as_str())
        .unwrap_or("-");
    let offset = match app.group.try_offset() {
        Some(offset) => format!("{:.0}", offset),
        None => "-".to_string(),
    };
    format!(
        " {} | Panes: {}/{} | Offset: {} | Changes: {}",
        focus,
        app.group.attached_count(),
        app.panes.len(),
        offset,
        app.offset_changes()
    )
}
