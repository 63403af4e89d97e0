//! Console spinner drawn on stderr while a model call is in flight.

use crossterm::{
    cursor::{Hide, MoveToColumn, Show},
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use std::future::Future;
use std::io::{self, Write};
use std::time::{Duration, Instant};

/// Braille spinner frames, shared with the in-TUI loading indicator.
pub const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const FRAME_COLOR: Color = Color::Rgb {
    r: 140,
    g: 140,
    b: 140,
};
const TEXT_COLOR: Color = Color::Rgb {
    r: 180,
    g: 180,
    b: 180,
};
const FAIL_COLOR: Color = Color::Rgb {
    r: 230,
    g: 120,
    b: 120,
};

pub struct Spinner {
    current_frame: usize,
    message: String,
    last_update: Instant,
    frame_duration: Duration,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        Self {
            current_frame: 0,
            message: message.to_string(),
            last_update: Instant::now(),
            frame_duration: Duration::from_millis(80),
        }
    }

    pub fn with_frame_duration(mut self, duration: Duration) -> Self {
        self.frame_duration = duration;
        self
    }

    pub fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.current_frame]
    }

    /// Hide the cursor and draw the first frame.
    pub fn start(&self) {
        let _ = execute!(io::stderr(), Hide);
        self.render();
    }

    /// Clear the spinner line and restore the cursor.
    pub fn stop(&self) {
        let _ = execute!(
            io::stderr(),
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Show
        );
    }

    /// Advance one frame if the frame duration has passed.
    pub fn tick(&mut self) {
        if self.last_update.elapsed() >= self.frame_duration {
            self.current_frame = (self.current_frame + 1) % SPINNER_FRAMES.len();
            self.last_update = Instant::now();
            self.render();
        }
    }

    pub fn set_message(&mut self, msg: &str) {
        self.message = msg.to_string();
        self.render();
    }

    fn render(&self) {
        let _ = execute!(
            io::stderr(),
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            SetForegroundColor(FRAME_COLOR),
            Print(format!("  {} ", self.frame())),
            SetForegroundColor(TEXT_COLOR),
            Print(&self.message),
            ResetColor
        );
        let _ = io::stderr().flush();
    }

    pub fn finish_with_message(&self, msg: &str) {
        self.finish("✓", FRAME_COLOR, msg);
    }

    pub fn finish_with_error(&self, msg: &str) {
        self.finish("✗", FAIL_COLOR, msg);
    }

    fn finish(&self, mark: &str, mark_color: Color, msg: &str) {
        let _ = execute!(
            io::stderr(),
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            SetForegroundColor(mark_color),
            Print(format!("  {} ", mark)),
            SetForegroundColor(TEXT_COLOR),
            Print(msg),
            ResetColor,
            Print("\n"),
            Show
        );
    }
}

/// Drive `spinner` until `fut` resolves.
pub async fn spin_until<F: Future>(spinner: &mut Spinner, fut: F) -> F::Output {
    tokio::pin!(fut);
    let mut interval = tokio::time::interval(spinner.frame_duration);
    loop {
        tokio::select! {
            out = &mut fut => return out,
            _ = interval.tick() => spinner.tick(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_wrap_around() {
        let mut spinner = Spinner::new("working").with_frame_duration(Duration::ZERO);
        assert_eq!(spinner.frame(), SPINNER_FRAMES[0]);
        for _ in 0..SPINNER_FRAMES.len() {
            spinner.tick();
        }
        assert_eq!(spinner.frame(), SPINNER_FRAMES[0]);
        spinner.tick();
        assert_eq!(spinner.frame(), SPINNER_FRAMES[1]);
    }

    #[test]
    fn test_tick_waits_for_frame_duration() {
        let mut spinner = Spinner::new("working").with_frame_duration(Duration::from_secs(3600));
        spinner.tick();
        assert_eq!(spinner.frame(), SPINNER_FRAMES[0]);
    }

    #[tokio::test]
    async fn test_spin_until_returns_future_output() {
        let mut spinner = Spinner::new("working").with_frame_duration(Duration::from_millis(5));
        let out = spin_until(&mut spinner, async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            42
        })
        .await;
        assert_eq!(out, 42);
    }
}
