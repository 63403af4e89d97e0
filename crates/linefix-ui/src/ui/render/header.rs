use crate::ui::theme::Theme;
use crate::ui::App;
use linefix_core::AnalysisMode;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Gauge, Paragraph},
    Frame,
};

const GAUGE_COLS: u16 = 28;

pub(super) fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(20),
            Constraint::Length(GAUGE_COLS),
            Constraint::Length(2),
        ])
        .split(area);

    let mut spans = vec![
        Span::styled("  ", Style::default()),
        Span::styled(Theme::LOGO, Style::default().fg(Theme::GREY_100)),
        Span::styled("   ", Style::default()),
        Span::styled(
            app.title.clone(),
            Style::default()
                .fg(Theme::GREY_200)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {}", app.mode.label()),
            Style::default().fg(Theme::GREY_500),
        ),
        Span::styled("    ", Style::default()),
    ];
    spans.extend(counter_spans(app));

    let header = Paragraph::new(vec![Line::from(""), Line::from(spans)])
        .style(Style::default().bg(Theme::BG));
    frame.render_widget(header, columns[0]);

    if app.mode == AnalysisMode::Review {
        let gauge_area = Rect {
            y: columns[1].y + 1,
            height: 1,
            ..columns[1]
        };
        frame.render_widget(progress_gauge(app), gauge_area);
    }
}

fn counter_spans(app: &App) -> Vec<Span<'static>> {
    let label = Style::default().fg(Theme::GREY_400);
    match app.mode {
        AnalysisMode::Review => {
            let counters = app.counters();
            let found_color = if counters.remaining == 0 {
                Theme::GREY_300
            } else {
                Theme::RED
            };
            vec![
                Span::styled("Errors Found: ", label),
                Span::styled(
                    format!("{}/{}", counters.remaining, counters.total),
                    Style::default().fg(found_color),
                ),
                Span::styled("   Errors Fixed: ", label),
                Span::styled(
                    format!("{}/{}", counters.fixed, counters.total),
                    Style::default().fg(Theme::GREEN),
                ),
            ]
        }
        AnalysisMode::EdgeCases => {
            let edge_cases = app.session().map(|s| s.edge_cases()).unwrap_or(&[]);
            let bugs = edge_cases.iter().filter(|e| e.is_bug).count();
            vec![
                Span::styled("Edge cases: ", label),
                Span::styled(
                    edge_cases.len().to_string(),
                    Style::default().fg(Theme::GREY_200),
                ),
                Span::styled("   Bugs: ", label),
                Span::styled(bugs.to_string(), Style::default().fg(Theme::RED)),
            ]
        }
    }
}

/// Progress ring stand-in: `fixed / total`, full when there is nothing to fix.
fn progress_gauge(app: &App) -> Gauge<'static> {
    let progress = app.session().map(|s| s.progress()).unwrap_or(1.0);
    Gauge::default()
        .gauge_style(Style::default().fg(Theme::GREEN).bg(Theme::GREY_700))
        .ratio(progress.clamp(0.0, 1.0))
        .label(Span::styled(
            format!("{:.0}%", progress * 100.0),
            Style::default().fg(Theme::GREY_100),
        ))
}
