//! Results surface state and rendering.

mod render;
pub mod theme;

pub use render::render;

use linefix_core::results::Counters;
use linefix_core::{
    AnalysisMode, HostMessage, ResultsSession, SessionKey, SessionOpen, SessionRegistry,
    SurfaceMessage,
};
use linefix_engine::AnalysisReport;
use std::time::{Duration, Instant};

const TOAST_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

/// Short-lived status message in the footer.
#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    created: Instant,
}

impl Toast {
    fn new(message: impl Into<String>, level: ToastLevel) -> Self {
        Self {
            message: message.into(),
            level,
            created: Instant::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.created.elapsed() >= TOAST_TTL
    }
}

/// Everything the results surface draws from.
pub struct App {
    pub mode: AnalysisMode,
    /// `file:start-end`, 1-based.
    pub title: String,
    pub registry: SessionRegistry,
    pub key: SessionKey,
    pub selected: usize,
    /// Error text or "No issues found" for the current analysis.
    pub notice: Option<String>,
    /// The current analysis ended in an error worth showing as one.
    pub failed: bool,
    /// Elements the model sent that failed validation.
    pub rejected: usize,
    pub toast: Option<Toast>,
    pub loading: bool,
    pub loading_frame: usize,
    pub should_quit: bool,
    pub needs_redraw: bool,
}

impl App {
    pub fn new(key: SessionKey, title: impl Into<String>, report: &AnalysisReport) -> Self {
        let mut app = Self {
            mode: report.mode,
            title: title.into(),
            registry: SessionRegistry::new(),
            key,
            selected: 0,
            notice: None,
            failed: false,
            rejected: 0,
            toast: None,
            loading: false,
            loading_frame: 0,
            should_quit: false,
            needs_redraw: true,
        };
        app.load_report(report);
        app
    }

    /// Install a fresh analysis as the session for this region. A second
    /// report for the same region replaces the first.
    pub fn load_report(&mut self, report: &AnalysisReport) {
        let session =
            ResultsSession::new(&report.findings).with_edge_cases(report.edge_cases.clone());
        self.mode = report.mode;
        self.notice = report.notice();
        self.failed = report.error.as_ref().is_some_and(|e| e.is_user_error());
        self.rejected = report.rejected().len();
        self.selected = 0;
        self.loading = false;
        if self.registry.open_or_replace(self.key.clone(), session) == SessionOpen::Refocused {
            self.show_toast("Results refreshed", ToastLevel::Info);
        }
        self.needs_redraw = true;
    }

    pub fn session(&self) -> Option<&ResultsSession> {
        self.registry.get(&self.key)
    }

    pub fn counters(&self) -> Counters {
        self.session().map(ResultsSession::counters).unwrap_or(Counters {
            total: 0,
            fixed: 0,
            remaining: 0,
        })
    }

    /// Number of navigable rows in the current mode.
    pub fn item_count(&self) -> usize {
        match (self.mode, self.session()) {
            (_, None) => 0,
            (AnalysisMode::Review, Some(session)) => session.total(),
            (AnalysisMode::EdgeCases, Some(session)) => session.edge_cases().len(),
        }
    }

    /// 1-based document line for a relative line of this selection.
    pub fn document_line(&self, relative_line: usize) -> usize {
        self.key.start_line + relative_line
    }

    pub fn navigate_down(&mut self) {
        if self.selected + 1 < self.item_count() {
            self.selected += 1;
        }
    }

    pub fn navigate_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.item_count().saturating_sub(1);
    }

    /// Press the selected row's action control.
    pub fn request_apply_selected(&mut self) -> Option<SurfaceMessage> {
        if self.loading {
            self.show_toast("Wait for the analysis to finish", ToastLevel::Info);
            return None;
        }
        if self.mode != AnalysisMode::Review {
            return None;
        }
        let index = self.selected;
        let session = self.registry.get_mut(&self.key)?;
        let message = session.request_apply(index);
        if message.is_some() {
            self.needs_redraw = true;
        }
        message
    }

    /// Resolve a fix host reply against the open session.
    pub fn apply_host_message(&mut self, message: &HostMessage) {
        let Some(session) = self.registry.get_mut(&self.key) else {
            return;
        };
        if session.handle(message).is_none() {
            return;
        }
        let complete = session.is_complete();
        let line = self.document_line(message.relative_line());

        match message {
            HostMessage::FixSucceeded { .. } if complete => {
                self.show_toast(format!("Fixed line {}. All issues fixed", line), ToastLevel::Success)
            }
            HostMessage::FixSucceeded { .. } => {
                self.show_toast(format!("Fixed line {}", line), ToastLevel::Success)
            }
            HostMessage::FixFailed { reason, .. } => {
                self.show_toast(format!("Fix failed: {}", reason), ToastLevel::Error)
            }
        }
    }

    pub fn start_loading(&mut self) {
        self.loading = true;
        self.loading_frame = 0;
        self.needs_redraw = true;
    }

    pub fn tick_loading(&mut self) {
        if self.loading {
            self.loading_frame = self.loading_frame.wrapping_add(1);
        }
    }

    pub fn show_toast(&mut self, message: impl Into<String>, level: ToastLevel) {
        self.toast = Some(Toast::new(message, level));
        self.needs_redraw = true;
    }

    /// Drop the toast once it has been visible long enough.
    pub fn clear_expired_toast(&mut self) -> bool {
        if self.toast.as_ref().is_some_and(Toast::is_expired) {
            self.toast = None;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linefix_core::RowState;
    use linefix_engine::analyze_response;

    const REPLY: &str = r#"[
        {"relativeLine": 1, "severity": "Error", "finding": "missing semicolon", "fix": "int x = 0;"},
        {"relativeLine": 2, "severity": "Info", "finding": "style", "fix": "x"},
        {"relativeLine": 3, "severity": "Warning", "finding": "unused", "fix": ""}
    ]"#;

    fn app() -> App {
        let report = analyze_response(REPLY, AnalysisMode::Review);
        App::new(SessionKey::new("main.c", 4, 6), "main.c:5-7", &report)
    }

    #[test]
    fn test_info_rows_are_not_listed() {
        let app = app();
        assert_eq!(app.item_count(), 2);
        assert_eq!(
            app.counters(),
            Counters {
                total: 2,
                fixed: 0,
                remaining: 2
            }
        );
    }

    #[test]
    fn test_apply_then_ack_updates_counters() {
        let mut app = app();
        let message = app.request_apply_selected().unwrap();
        assert_eq!(
            message,
            SurfaceMessage::ApplyFix {
                relative_line: 1,
                fix_text: "int x = 0;".to_string()
            }
        );
        assert_eq!(app.session().unwrap().rows()[0].state(), RowState::Applying);
        assert!(app.request_apply_selected().is_none());

        app.apply_host_message(&HostMessage::FixSucceeded { relative_line: 1 });
        assert_eq!(app.counters().fixed, 1);
        assert_eq!(app.toast.as_ref().unwrap().message, "Fixed line 5");
    }

    #[test]
    fn test_failed_fix_shows_reason_and_reenables_row() {
        let mut app = app();
        app.request_apply_selected().unwrap();
        app.apply_host_message(&HostMessage::FixFailed {
            relative_line: 1,
            reason: "Cannot find target line 1".to_string(),
        });
        let toast = app.toast.as_ref().unwrap();
        assert_eq!(toast.level, ToastLevel::Error);
        assert!(toast.message.contains("Cannot find target line"));
        assert!(app.session().unwrap().rows()[0].can_apply());
        assert_eq!(app.counters().fixed, 0);
    }

    #[test]
    fn test_reload_replaces_session() {
        let mut app = app();
        app.request_apply_selected().unwrap();
        app.apply_host_message(&HostMessage::FixSucceeded { relative_line: 1 });
        app.navigate_down();

        app.load_report(&analyze_response("[]", AnalysisMode::Review));
        assert_eq!(app.registry.len(), 1);
        assert_eq!(app.selected, 0);
        assert_eq!(app.counters().total, 0);
        assert_eq!(app.notice.as_deref(), Some("No issues found"));
        assert_eq!(app.toast.as_ref().unwrap().message, "Results refreshed");
    }

    #[test]
    fn test_late_ack_after_reload_is_ignored() {
        let mut app = app();
        app.request_apply_selected().unwrap();
        app.load_report(&analyze_response(REPLY, AnalysisMode::Review));
        app.apply_host_message(&HostMessage::FixSucceeded { relative_line: 1 });
        assert_eq!(app.counters().fixed, 0);
    }

    #[test]
    fn test_navigation_is_clamped() {
        let mut app = app();
        app.navigate_up();
        assert_eq!(app.selected, 0);
        app.navigate_down();
        app.navigate_down();
        assert_eq!(app.selected, 1);
        app.select_first();
        assert_eq!(app.selected, 0);
        app.select_last();
        assert_eq!(app.selected, 1);
    }

    #[test]
    fn test_edge_case_mode_has_no_fix_action() {
        let raw = r#"[{"input": "0", "actualOutput": "crash", "expectedOutput": "0", "isBug": true}]"#;
        let report = analyze_response(raw, AnalysisMode::EdgeCases);
        let mut app = App::new(SessionKey::new("main.c", 0, 3), "main.c:1-4", &report);
        assert_eq!(app.item_count(), 1);
        assert!(app.request_apply_selected().is_none());
    }

    #[test]
    fn test_apply_blocked_while_loading() {
        let mut app = app();
        app.start_loading();
        assert!(app.request_apply_selected().is_none());
        assert!(app.session().unwrap().rows()[0].can_apply());
    }
}
