use ratatui::style::Color;

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub user: Color,
    pub assistant: Color,
    pub error: Color,
    pub accent: Color,
    pub text: Color,
    pub dim: Color,
    pub border: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            user: Color::Magenta,
            assistant: Color::Green,
            error: Color::Red,
            accent: Color::Indexed(63),
            text: Color::Reset,
            dim: Color::DarkGray,
            border: Color::Indexed(240),
        }
    }
}
