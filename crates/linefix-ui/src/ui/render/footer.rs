use crate::spinner::SPINNER_FRAMES;
use crate::ui::theme::Theme;
use crate::ui::{App, ToastLevel};
use linefix_core::AnalysisMode;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// A footer button with its key and label
struct FooterButton {
    key: &'static str,
    label: &'static str,
    key_fg: Color,
    key_bg: Color,
    label_fg: Color,
}

impl FooterButton {
    fn new(
        key: &'static str,
        label: &'static str,
        key_fg: Color,
        key_bg: Color,
        label_fg: Color,
    ) -> Self {
        Self {
            key,
            label,
            key_fg,
            key_bg,
            label_fg,
        }
    }

    fn width(&self) -> usize {
        // " key " + " label  "
        self.key.width() + 2 + self.label.width() + 3
    }

    fn to_spans(&self) -> Vec<Span<'static>> {
        vec![
            Span::styled(
                format!(" {} ", self.key),
                Style::default().fg(self.key_fg).bg(self.key_bg),
            ),
            Span::styled(
                format!(" {}  ", self.label),
                Style::default().fg(self.label_fg),
            ),
        ]
    }
}

fn primary_button(key: &'static str, label: &'static str) -> FooterButton {
    FooterButton::new(key, label, Theme::GREY_900, Theme::GREEN, Theme::GREY_300)
}

fn hint_button(key: &'static str, label: &'static str) -> FooterButton {
    FooterButton::new(
        key,
        label,
        Theme::GREY_900,
        Theme::GREY_500,
        Theme::GREY_500,
    )
}

/// Cut `text` to at most `max` terminal columns, ending in `…` when cut.
pub(crate) fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > max - 1 {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

pub(super) fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let available_width = area.width as usize;

    let mut buttons = Vec::new();
    let can_apply = app.mode == AnalysisMode::Review
        && !app.loading
        && app
            .session()
            .and_then(|s| s.row(app.selected))
            .is_some_and(|row| row.can_apply());
    if can_apply {
        buttons.push(primary_button("↵", "fix"));
    }
    if app.item_count() > 1 {
        buttons.push(hint_button("↑↓", "move"));
    }
    if !app.loading {
        buttons.push(hint_button("r", "re-run"));
    }
    buttons.push(hint_button("q", "quit"));

    let buttons_width: usize = buttons.iter().map(FooterButton::width).sum::<usize>() + 1;
    let space_for_status = available_width.saturating_sub(buttons_width + 4);

    let (status, status_color) = status_text(app);
    let status = truncate_to_width(&status, space_for_status);

    let mut spans: Vec<Span> = vec![
        Span::styled("  ", Style::default()),
        Span::styled(status.clone(), Style::default().fg(status_color)),
    ];

    let used = 2 + status.width() + buttons_width;
    let spacer_len = available_width.saturating_sub(used);
    if spacer_len > 0 {
        spans.push(Span::styled(" ".repeat(spacer_len), Style::default()));
    }
    for btn in &buttons {
        spans.extend(btn.to_spans());
    }
    spans.push(Span::styled(" ", Style::default()));

    let footer = Paragraph::new(vec![Line::from(""), Line::from(spans)])
        .style(Style::default().bg(Theme::GREY_900));
    frame.render_widget(footer, area);
}

/// Left side of the footer: the toast, the re-analysis spinner, or a summary.
fn status_text(app: &App) -> (String, Color) {
    if let Some(toast) = &app.toast {
        let color = match toast.level {
            ToastLevel::Info => Theme::GREY_200,
            ToastLevel::Success => Theme::GREEN,
            ToastLevel::Error => Theme::RED,
        };
        return (toast.message.clone(), color);
    }
    if app.loading {
        let frame = SPINNER_FRAMES[app.loading_frame % SPINNER_FRAMES.len()];
        return (
            format!("{} {}...", frame, app.mode.progress_title()),
            Theme::GREY_300,
        );
    }

    let mut summary = match app.session().and_then(|s| s.row(app.selected)) {
        Some(row) if app.mode == AnalysisMode::Review => match row.last_error() {
            Some(err) => format!("Last attempt failed: {}", err),
            None => format!("{} of {}", app.selected + 1, app.item_count()),
        },
        _ if app.item_count() > 0 => format!("{} of {}", app.selected + 1, app.item_count()),
        _ => String::new(),
    };
    if app.rejected > 0 {
        if !summary.is_empty() {
            summary.push_str("  ·  ");
        }
        summary.push_str(&format!("{} skipped", app.rejected));
    }
    (summary, Theme::GREY_500)
}
