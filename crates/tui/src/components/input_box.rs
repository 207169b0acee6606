use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::app::{App, AppMode};
use crate::spinner::SpinnerState;
use crate::theme::Theme;

const PROMPT_CHAR: &str = "┃ ";
const PLACEHOLDER: &str = "Send a message...";

pub fn draw(frame: &mut Frame, area: Rect, app: &App, theme: &Theme, spinner: &SpinnerState) {
    let waiting = app.mode == AppMode::Waiting;
    let border_color = if waiting { theme.border } else { theme.accent };

    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let lead = if waiting {
        Span::styled(
            format!("{} ", spinner.current_frame()),
            Style::default().fg(theme.accent),
        )
    } else {
        Span::styled(PROMPT_CHAR, Style::default().fg(theme.accent))
    };

    let body = if app.input.is_empty() && !waiting {
        Span::styled(PLACEHOLDER, Style::default().fg(theme.dim))
    } else {
        Span::styled(app.input.as_str(), Style::default().fg(theme.text))
    };

    let lead_width = lead.width() as u16;
    let line = Line::from(vec![lead, body]);
    let text_width = Line::from(app.input.as_str()).width() as u16;
    let visible = inner.width.saturating_sub(lead_width + 1);
    let offset = text_width.saturating_sub(visible);

    frame.render_widget(Paragraph::new(line).scroll((0, offset)), inner);

    if !waiting {
        let x = inner.x + lead_width + text_width.min(visible);
        frame.set_cursor_position(Position::new(x, inner.y));
    }
}
