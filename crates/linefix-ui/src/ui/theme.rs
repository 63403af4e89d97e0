//! linefix palette: high-contrast greys with a few status accents.

use linefix_core::{RowState, Severity};
use ratatui::style::Color;

pub struct Theme;

impl Theme {
    // ─────────────────────────────────────────────────────────────────────
    // Greys
    // ─────────────────────────────────────────────────────────────────────

    pub const WHITE: Color = Color::Rgb(255, 255, 255);

    /// Primary text
    pub const GREY_100: Color = Color::Rgb(240, 240, 240);

    /// Secondary text
    pub const GREY_200: Color = Color::Rgb(220, 220, 220);

    /// Muted text
    pub const GREY_300: Color = Color::Rgb(190, 190, 190);

    pub const GREY_400: Color = Color::Rgb(155, 155, 155);

    /// Borders, separators
    pub const GREY_500: Color = Color::Rgb(120, 120, 120);

    pub const GREY_600: Color = Color::Rgb(70, 70, 70);

    /// Selected row background
    pub const GREY_700: Color = Color::Rgb(45, 45, 45);

    pub const GREY_800: Color = Color::Rgb(28, 28, 28);

    pub const GREY_900: Color = Color::Rgb(16, 16, 16);

    pub const BG: Color = Self::GREY_900;

    // ─────────────────────────────────────────────────────────────────────
    // Accents
    // ─────────────────────────────────────────────────────────────────────

    /// Applied fixes, progress
    pub const GREEN: Color = Color::Rgb(130, 220, 130);

    /// Errors, failures
    pub const RED: Color = Color::Rgb(230, 120, 120);

    /// Warnings, in-flight work
    pub const YELLOW: Color = Color::Rgb(255, 200, 100);

    /// Live action controls
    pub const ACCENT: Color = Color::Rgb(140, 180, 255);

    pub const LOGO: &'static str = "𝘭 𝘪 𝘯 𝘦 𝘧 𝘪 𝘹";

    pub const CHECK: &'static str = "✓";

    pub fn severity(severity: Severity) -> Color {
        match severity {
            Severity::Error => Self::RED,
            Severity::Warning => Self::YELLOW,
            Severity::Info => Self::GREY_400,
        }
    }

    pub fn row_state(state: RowState) -> Color {
        match state {
            RowState::Unfixed => Self::ACCENT,
            RowState::Applying => Self::YELLOW,
            RowState::Fixed => Self::GREEN,
        }
    }
}
