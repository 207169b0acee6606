use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::app::{App, AppMode};
use crate::theme::Theme;

pub fn draw(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let hints = match app.mode {
        AppMode::Waiting => "esc cancel  ^C quit",
        AppMode::Input => "enter send  esc quit",
    };

    let right = format!("{} ", app.status);
    let right_width = right.chars().count() as u16;
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);

    frame.render_widget(
        Paragraph::new(Span::styled(format!(" {hints}"), Style::default().fg(theme.dim))),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(Span::styled(right, Style::default().fg(theme.dim)))
            .alignment(Alignment::Right),
        chunks[1],
    );
}
