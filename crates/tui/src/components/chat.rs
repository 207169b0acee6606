use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::app::{App, DisplayItem, Role};
use crate::theme::Theme;

pub fn draw(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let paragraph = Paragraph::new(transcript_lines(app, theme)).wrap(Wrap { trim: false });

    // Rows after wrapping, not logical lines.
    let total_rows = u16::try_from(paragraph.line_count(area.width)).unwrap_or(u16::MAX);
    let auto_scroll = total_rows.saturating_sub(area.height);
    let scroll = auto_scroll.saturating_sub(app.scroll_offset);

    frame.render_widget(paragraph.scroll((scroll, 0)), area);
}

pub fn transcript_lines<'a>(app: &'a App, theme: &Theme) -> Vec<Line<'a>> {
    let mut lines = Vec::new();

    for item in &app.items {
        match item {
            DisplayItem::Message { role, content } => {
                let (label, color) = match role {
                    Role::User => (app.user_label.as_str(), theme.user),
                    Role::Assistant => (app.assistant_label.as_str(), theme.assistant),
                };
                push_labelled(&mut lines, label, color, content, theme.text);
            }
            DisplayItem::Error(message) => {
                push_labelled(&mut lines, "Error", theme.error, message, theme.error);
            }
        }
        lines.push(Line::default());
    }

    if !app.current_stream.is_empty() {
        push_labelled(
            &mut lines,
            &app.assistant_label,
            theme.assistant,
            &app.current_stream,
            theme.text,
        );
    }

    lines
}

/// First line carries the `label: ` prefix; continuation lines are indented
/// to line up under the text.
fn push_labelled<'a>(
    lines: &mut Vec<Line<'a>>,
    label: &str,
    label_color: Color,
    content: &'a str,
    text_color: Color,
) {
    let prefix = format!("{label}: ");
    let indent = " ".repeat(prefix.chars().count());
    let mut rows = content.lines();

    let first = rows.next().unwrap_or_default();
    lines.push(Line::from(vec![
        Span::styled(prefix, Style::default().fg(label_color).bold()),
        Span::styled(first, Style::default().fg(text_color)),
    ]));
    for row in rows {
        lines.push(Line::from(vec![
            Span::raw(indent.clone()),
            Span::styled(row, Style::default().fg(text_color)),
        ]));
    }
}
