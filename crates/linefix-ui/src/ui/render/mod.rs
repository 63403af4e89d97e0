mod footer;
mod header;
mod main;

use crate::ui::theme::Theme;
use crate::ui::App;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::Block,
    Frame,
};

use footer::render_footer;
use header::render_header;
use main::render_main;

pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    frame.render_widget(Block::default().style(Style::default().bg(Theme::BG)), area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header (title, counters, progress)
            Constraint::Min(10),   // Results
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_header(frame, layout[0], app);
    render_main(frame, layout[1], app);
    render_footer(frame, layout[2], app);
}

#[cfg(test)]
mod tests {
    use super::*;
    use linefix_core::{AnalysisMode, HostMessage, SessionKey};
    use linefix_engine::analyze_response;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn screen(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn review_app() -> App {
        let raw = r#"[
            {"relativeLine": 1, "severity": "Warning", "finding": "uninitialized", "original": "int x", "fix": "int x = 0;", "explanation": "avoid UB"},
            {"relativeLine": 2, "severity": "Error", "finding": "missing semicolon", "fix": "printf(\"%d\", x);\nreturn 0;"}
        ]"#;
        let report = analyze_response(raw, AnalysisMode::Review);
        App::new(SessionKey::new("main.c", 2, 3), "main.c:3-4", &report)
    }

    #[test]
    fn test_review_screen_shows_counters_and_rows() {
        let text = screen(&review_app());
        assert!(text.contains("main.c:3-4"));
        assert!(text.contains("Errors Found: 2/2"));
        assert!(text.contains("Errors Fixed: 0/2"));
        assert!(text.contains("uninitialized"));
        assert!(text.contains("int x = 0;"));
        assert!(text.contains("return 0;"));
        assert!(text.contains("Fixed Code"));
    }

    #[test]
    fn test_fixed_row_shows_check_mark() {
        let mut app = review_app();
        app.request_apply_selected().unwrap();
        app.apply_host_message(&HostMessage::FixSucceeded { relative_line: 1 });
        let text = screen(&app);
        assert!(text.contains("Errors Found: 1/2"));
        assert!(text.contains("Errors Fixed: 1/2"));
        assert!(text.contains("✓"));
        assert!(text.contains("Fixed line 3"));
    }

    #[test]
    fn test_empty_result_shows_notice() {
        let report = analyze_response("[]", AnalysisMode::Review);
        let app = App::new(SessionKey::new("main.c", 0, 0), "main.c:1-1", &report);
        let text = screen(&app);
        assert!(text.contains("No issues found"));
        assert!(text.contains("Errors Fixed: 0/0"));
    }

    #[test]
    fn test_malformed_result_shows_error() {
        let report = analyze_response("Looks fine to me!", AnalysisMode::Review);
        let app = App::new(SessionKey::new("main.c", 0, 0), "main.c:1-1", &report);
        assert!(screen(&app).contains("Failed to parse AI response"));
    }

    #[test]
    fn test_edge_case_table() {
        let raw = r#"[{"Sr. No.": 1, "input": "\"\"", "actualOutput": "crash", "expectedOutput": "0", "isBug": true, "fixedCode": "if (!s) return 0;"}]"#;
        let report = analyze_response(raw, AnalysisMode::EdgeCases);
        let app = App::new(SessionKey::new("util.c", 0, 9), "util.c:1-10", &report);
        let text = screen(&app);
        assert!(text.contains("Expected"));
        assert!(text.contains("crash"));
        assert!(text.contains("if (!s) return 0;"));
        assert!(!text.contains("Errors Fixed"));
    }
}
