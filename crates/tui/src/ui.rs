use ratatui::prelude::*;

use crate::app::App;
use crate::components::{chat, footer, input_box};
use crate::spinner::SpinnerState;
use crate::theme::Theme;

pub fn draw(frame: &mut Frame, app: &App, theme: &Theme, spinner: &SpinnerState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    chat::draw(frame, chunks[0], app, theme);
    input_box::draw(frame, chunks[1], app, theme, spinner);
    footer::draw(frame, chunks[2], app, theme);
}
