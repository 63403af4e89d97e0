use crate::ui::theme::Theme;
use crate::ui::App;
use linefix_core::fix::display_lines;
use linefix_core::results::Row as ResultRow;
use linefix_core::{AnalysisMode, EdgeCase, RowState};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

/// Tallest a row may grow to show a multi-line fix.
const MAX_ROW_LINES: usize = 6;
const DETAIL_ROWS: u16 = 8;

pub(super) fn render_main(frame: &mut Frame, area: Rect, app: &App) {
    let padded = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(10),
            Constraint::Length(2),
        ])
        .split(area)[1];

    let Some(session) = app.session() else {
        render_notice(frame, padded, app);
        return;
    };

    match app.mode {
        AnalysisMode::Review if session.total() > 0 => {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(5), Constraint::Length(DETAIL_ROWS)])
                .split(padded);
            render_findings_table(frame, parts[0], app, session.rows());
            if let Some(row) = session.row(app.selected) {
                render_finding_detail(frame, parts[1], app, row);
            }
        }
        AnalysisMode::EdgeCases if !session.edge_cases().is_empty() => {
            render_edge_case_table(frame, padded, app, session.edge_cases());
        }
        _ => render_notice(frame, padded, app),
    }
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .title(format!(" {} ", title))
        .title_style(Style::default().fg(Theme::GREY_200))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Theme::GREY_600))
        .style(Style::default().bg(Theme::BG))
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    Row::new(titles.iter().map(|t| Cell::from(*t)))
        .style(
            Style::default()
                .fg(Theme::GREY_400)
                .add_modifier(Modifier::BOLD),
        )
        .bottom_margin(1)
}

fn multi_line_cell(text: &str, style: Style) -> (Cell<'static>, u16) {
    let lines: Vec<Line> = display_lines(text)
        .into_iter()
        .take(MAX_ROW_LINES)
        .map(|l| Line::from(Span::styled(l.to_string(), style)))
        .collect();
    let height = lines.len().max(1) as u16;
    (Cell::from(Text::from(lines)), height)
}

fn render_findings_table(frame: &mut Frame, area: Rect, app: &App, rows: &[ResultRow]) {
    let table_rows = rows.iter().map(|row| {
        let finding = row.finding();
        let state = row.state();
        let fix_style = if state == RowState::Fixed {
            Style::default().fg(Theme::GREY_500)
        } else {
            Style::default().fg(Theme::GREY_100)
        };
        let (fix_cell, height) = multi_line_cell(finding.proposed_fix(), fix_style);
        let severity = if state == RowState::Fixed {
            Cell::from(Theme::CHECK).style(Style::default().fg(Theme::GREEN))
        } else {
            Cell::from(finding.severity().label())
                .style(Style::default().fg(Theme::severity(finding.severity())))
        };

        Row::new(vec![
            Cell::from(app.document_line(finding.relative_line()).to_string())
                .style(Style::default().fg(Theme::GREY_400)),
            severity,
            Cell::from(finding.description().to_string())
                .style(Style::default().fg(Theme::GREY_200)),
            fix_cell,
            Cell::from(state.action_label()).style(Style::default().fg(Theme::row_state(state))),
        ])
        .height(height)
    });

    let widths = [
        Constraint::Length(6),
        Constraint::Length(9),
        Constraint::Fill(2),
        Constraint::Fill(3),
        Constraint::Length(13),
    ];
    let table = Table::new(table_rows, widths)
        .header(header_row(&["Line", "Severity", "Finding", "Fixed Code", "Action"]))
        .block(panel("Findings"))
        .row_highlight_style(Style::default().bg(Theme::GREY_700))
        .highlight_symbol("▸ ");

    let mut state = TableState::default().with_selected(Some(app.selected));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_finding_detail(frame: &mut Frame, area: Rect, app: &App, row: &ResultRow) {
    let finding = row.finding();
    let muted = Style::default().fg(Theme::GREY_500);
    let text = Style::default().fg(Theme::GREY_200);

    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!("Line {} ", app.document_line(finding.relative_line())),
            Style::default().fg(Theme::GREY_100),
        ),
        Span::styled(
            finding.severity().label(),
            Style::default().fg(Theme::severity(finding.severity())),
        ),
    ])];
    lines.push(Line::from(Span::styled(finding.description().to_string(), text)));
    if let Some(rationale) = finding.rationale() {
        lines.push(Line::from(vec![
            Span::styled("Why: ", muted),
            Span::styled(rationale.to_string(), text),
        ]));
    }
    if !finding.original_text().is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Original: ", muted),
            Span::styled(finding.original_text().to_string(), text),
        ]));
    }
    if let Some(err) = row.last_error() {
        lines.push(Line::from(vec![
            Span::styled("Last attempt: ", muted),
            Span::styled(err.to_string(), Style::default().fg(Theme::RED)),
        ]));
    }

    let detail = Paragraph::new(lines)
        .block(panel("Details"))
        .wrap(Wrap { trim: false });
    frame.render_widget(detail, area);
}

fn render_edge_case_table(frame: &mut Frame, area: Rect, app: &App, cases: &[EdgeCase]) {
    let rows = cases.iter().enumerate().map(|(i, case)| {
        let serial = case.serial.clone().unwrap_or_else(|| (i + 1).to_string());
        let (bug, bug_color) = if case.is_bug {
            ("yes", Theme::RED)
        } else {
            ("no", Theme::GREY_400)
        };
        let (fix_cell, height) = multi_line_cell(
            case.fixed_code.as_deref().unwrap_or(""),
            Style::default().fg(Theme::GREY_100),
        );
        let cell = |s: &str| Cell::from(s.to_string()).style(Style::default().fg(Theme::GREY_200));
        Row::new(vec![
            Cell::from(serial).style(Style::default().fg(Theme::GREY_400)),
            cell(&case.input),
            cell(&case.actual_output),
            cell(&case.expected_output),
            Cell::from(bug).style(Style::default().fg(bug_color)),
            fix_cell,
        ])
        .height(height)
    });

    let widths = [
        Constraint::Length(4),
        Constraint::Fill(2),
        Constraint::Fill(2),
        Constraint::Fill(2),
        Constraint::Length(4),
        Constraint::Fill(3),
    ];
    let table = Table::new(rows, widths)
        .header(header_row(&["#", "Input", "Actual", "Expected", "Bug", "Fixed Code"]))
        .block(panel("Edge cases"))
        .row_highlight_style(Style::default().bg(Theme::GREY_700))
        .highlight_symbol("▸ ");

    let mut state = TableState::default().with_selected(Some(app.selected));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_notice(frame: &mut Frame, area: Rect, app: &App) {
    let message = app.notice.clone().unwrap_or_else(|| "No issues found".to_string());
    let color = if app.failed { Theme::RED } else { Theme::GREY_300 };

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(color))),
    ];
    if app.rejected > 0 {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("{} malformed item(s) skipped", app.rejected),
            Style::default().fg(Theme::GREY_500),
        )));
    }

    let notice = Paragraph::new(lines)
        .block(panel("Results"))
        .alignment(ratatui::layout::Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(notice, area);
}
