use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chatgpt_client::Conversation;
use chatgpt_config::TuiConfig;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::spinner::SpinnerState;
use crate::theme::Theme;
use crate::ui::draw;
use crate::worker::{TurnRequest, TurnUpdate, Worker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Input,
    Waiting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayItem {
    Message { role: Role, content: String },
    Error(String),
}

pub struct App {
    pub mode: AppMode,
    pub input: String,
    pub items: Vec<DisplayItem>,
    pub current_stream: String,
    pub status: String,
    pub should_quit: bool,
    pub scroll_offset: u16,
    pub user_label: String,
    pub assistant_label: String,
    pub model_name: String,
    last_prompt: Option<String>,
    in_flight: Option<CancellationToken>,
}

impl App {
    pub fn new(config: &TuiConfig, model_name: &str) -> Self {
        Self {
            mode: AppMode::Input,
            input: String::new(),
            items: Vec::new(),
            current_stream: String::new(),
            status: model_name.to_string(),
            should_quit: false,
            scroll_offset: 0,
            user_label: config.user_label.clone(),
            assistant_label: config.assistant_label.clone(),
            model_name: model_name.to_string(),
            last_prompt: None,
            in_flight: None,
        }
    }

    /// Runs the interactive session until the user quits. Returns whatever was
    /// left unsent in the input box.
    pub async fn run(&mut self, conversation: Arc<Conversation>) -> Result<String> {
        terminal::enable_raw_mode()?;
        io::stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(io::stdout());
        let mut worker = Worker::spawn(conversation);
        let result = match Terminal::new(backend) {
            Ok(mut terminal) => self.event_loop(&mut terminal, &mut worker),
            Err(e) => Err(e.into()),
        };
        worker.shutdown();

        terminal::disable_raw_mode()?;
        io::stdout().execute(LeaveAlternateScreen)?;
        result.map(|()| std::mem::take(&mut self.input))
    }

    fn event_loop<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        worker: &mut Worker,
    ) -> Result<()> {
        let theme = Theme::default();
        let mut spinner = SpinnerState::new();

        loop {
            terminal.draw(|frame| draw(frame, self, &theme, &spinner))?;

            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        if let Some(request) = self.handle_key(key) {
                            if !worker.submit(request) {
                                self.apply(TurnUpdate::Finished(Err(
                                    chatgpt_client::ClientError::Cancelled,
                                )));
                            }
                        }
                    }
                }
            }

            while let Some(update) = worker.try_update() {
                self.apply(update);
            }

            if self.mode == AppMode::Waiting {
                spinner.tick();
            }

            if self.should_quit {
                return Ok(());
            }
        }
    }

    /// Applies one key press. Returns a turn to dispatch when Enter submits
    /// the input.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<TurnRequest> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit();
            return None;
        }

        match key.code {
            KeyCode::Esc => {
                if let Some(cancel) = &self.in_flight {
                    tracing::debug!("Cancelling in-flight turn");
                    cancel.cancel();
                } else {
                    self.quit();
                }
                None
            }
            KeyCode::Enter => self.submit(),
            KeyCode::Backspace => {
                self.input.pop();
                None
            }
            KeyCode::Up | KeyCode::PageUp => {
                self.scroll_offset = self.scroll_offset.saturating_add(scroll_step(key.code));
                None
            }
            KeyCode::Down | KeyCode::PageDown => {
                self.scroll_offset = self.scroll_offset.saturating_sub(scroll_step(key.code));
                None
            }
            KeyCode::Char(c) => {
                self.input.push(c);
                None
            }
            _ => None,
        }
    }

    fn submit(&mut self) -> Option<TurnRequest> {
        if self.mode == AppMode::Waiting {
            return None;
        }
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return None;
        }

        self.input.clear();
        self.items.push(DisplayItem::Message {
            role: Role::User,
            content: text.clone(),
        });
        self.last_prompt = Some(text.clone());
        self.current_stream.clear();
        self.scroll_offset = 0;
        self.mode = AppMode::Waiting;
        self.status = "waiting for reply".to_string();

        let cancel = CancellationToken::new();
        self.in_flight = Some(cancel.clone());
        Some(TurnRequest { text, cancel })
    }

    pub fn apply(&mut self, update: TurnUpdate) {
        match update {
            TurnUpdate::Partial(text) => {
                self.current_stream = text;
            }
            TurnUpdate::Finished(Ok(reply)) => {
                self.current_stream.clear();
                self.items.push(DisplayItem::Message {
                    role: Role::Assistant,
                    content: reply,
                });
                self.last_prompt = None;
                self.finish_turn();
            }
            TurnUpdate::Finished(Err(e)) => {
                self.current_stream.clear();
                self.items.push(DisplayItem::Error(e.to_string()));
                if self.input.is_empty() {
                    if let Some(prompt) = self.last_prompt.take() {
                        self.input = prompt;
                    }
                }
                self.finish_turn();
            }
        }
    }

    fn finish_turn(&mut self) {
        self.in_flight = None;
        self.mode = AppMode::Input;
        self.status = self.model_name.clone();
    }

    fn quit(&mut self) {
        if let Some(cancel) = self.in_flight.take() {
            cancel.cancel();
        }
        self.should_quit = true;
    }
}

fn scroll_step(code: KeyCode) -> u16 {
    match code {
        KeyCode::PageUp | KeyCode::PageDown => 10,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use chatgpt_client::ClientError;

    use super::*;

    fn app() -> App {
        App::new(&TuiConfig::default(), "text-davinci-002-render")
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            assert!(app.handle_key(press(KeyCode::Char(c))).is_none());
        }
    }

    #[test]
    fn enter_submits_trimmed_input() {
        let mut app = app();
        type_text(&mut app, "  hello ");
        let request = app.handle_key(press(KeyCode::Enter)).unwrap();
        assert_eq!(request.text, "hello");
        assert!(app.input.is_empty());
        assert_eq!(app.mode, AppMode::Waiting);
        assert_eq!(
            app.items,
            [DisplayItem::Message {
                role: Role::User,
                content: "hello".to_string()
            }]
        );
    }

    #[test]
    fn blank_input_is_not_sent() {
        let mut app = app();
        type_text(&mut app, "   ");
        assert!(app.handle_key(press(KeyCode::Enter)).is_none());
        assert_eq!(app.mode, AppMode::Input);
        assert!(app.items.is_empty());
    }

    #[test]
    fn enter_is_ignored_while_waiting() {
        let mut app = app();
        type_text(&mut app, "one");
        app.handle_key(press(KeyCode::Enter)).unwrap();
        type_text(&mut app, "two");
        assert!(app.handle_key(press(KeyCode::Enter)).is_none());
        assert_eq!(app.input, "two");
    }

    #[test]
    fn partials_then_reply() {
        let mut app = app();
        type_text(&mut app, "hi");
        app.handle_key(press(KeyCode::Enter)).unwrap();

        app.apply(TurnUpdate::Partial("Hel".to_string()));
        assert_eq!(app.current_stream, "Hel");
        app.apply(TurnUpdate::Partial("Hello".to_string()));
        assert_eq!(app.current_stream, "Hello");

        app.apply(TurnUpdate::Finished(Ok("Hello!".to_string())));
        assert!(app.current_stream.is_empty());
        assert_eq!(app.mode, AppMode::Input);
        assert_eq!(
            app.items.last(),
            Some(&DisplayItem::Message {
                role: Role::Assistant,
                content: "Hello!".to_string()
            })
        );
    }

    #[test]
    fn failed_turn_restores_input() {
        let mut app = app();
        type_text(&mut app, "retry me");
        app.handle_key(press(KeyCode::Enter)).unwrap();
        app.apply(TurnUpdate::Partial("par".to_string()));

        app.apply(TurnUpdate::Finished(Err(ClientError::Remote {
            status: 500,
            body: String::new(),
        })));
        assert_eq!(app.input, "retry me");
        assert!(app.current_stream.is_empty());
        assert_eq!(app.mode, AppMode::Input);
        assert_eq!(
            app.items.last(),
            Some(&DisplayItem::Error("Unexpected status 500".to_string()))
        );
    }

    #[test]
    fn failed_turn_keeps_newer_input() {
        let mut app = app();
        type_text(&mut app, "first");
        app.handle_key(press(KeyCode::Enter)).unwrap();
        type_text(&mut app, "draft");
        app.apply(TurnUpdate::Finished(Err(ClientError::Cancelled)));
        assert_eq!(app.input, "draft");
    }

    #[test]
    fn esc_cancels_then_quits() {
        let mut app = app();
        type_text(&mut app, "hi");
        let request = app.handle_key(press(KeyCode::Enter)).unwrap();

        app.handle_key(press(KeyCode::Esc));
        assert!(request.cancel.is_cancelled());
        assert!(!app.should_quit);

        app.apply(TurnUpdate::Finished(Err(ClientError::Cancelled)));
        app.handle_key(press(KeyCode::Esc));
        assert!(app.should_quit);
    }

    #[test]
    fn ctrl_c_quits_and_cancels() {
        let mut app = app();
        type_text(&mut app, "hi");
        let request = app.handle_key(press(KeyCode::Enter)).unwrap();
        type_text(&mut app, "unsent");

        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
        assert!(request.cancel.is_cancelled());
        assert_eq!(app.input, "unsent");
    }

    #[test]
    fn backspace_and_scroll() {
        let mut app = app();
        type_text(&mut app, "abc");
        app.handle_key(press(KeyCode::Backspace));
        assert_eq!(app.input, "ab");

        app.handle_key(press(KeyCode::PageUp));
        app.handle_key(press(KeyCode::Up));
        assert_eq!(app.scroll_offset, 11);
        app.handle_key(press(KeyCode::PageDown));
        app.handle_key(press(KeyCode::PageDown));
        assert_eq!(app.scroll_offset, 0);
    }
}
