use std::time::{Duration, Instant};

const FRAME_DURATION: Duration = Duration::from_millis(100);

const FRAMES: &[&str] = &["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

/// Dot spinner shown while a turn is in flight. Advances on wall-clock time,
/// so calling `tick` more often than once per frame is harmless.
pub struct SpinnerState {
    frame: usize,
    last_tick: Instant,
}

impl SpinnerState {
    pub fn new() -> Self {
        Self {
            frame: 0,
            last_tick: Instant::now(),
        }
    }

    pub fn tick(&mut self) {
        self.advance_at(Instant::now());
    }

    fn advance_at(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_tick);
        if elapsed >= FRAME_DURATION {
            let steps = (elapsed.as_millis() / FRAME_DURATION.as_millis()) as usize;
            self.frame = (self.frame + steps) % FRAMES.len();
            self.last_tick = now;
        }
    }

    pub fn current_frame(&self) -> &'static str {
        FRAMES[self.frame]
    }
}

impl Default for SpinnerState {
    fn default() -> Self {
        Self::new()
    }
}
