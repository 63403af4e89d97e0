//! Terminal runtime for the results surface.
//!
//! The fix host owns the file on its own thread. The event loop never touches
//! the document; it only sends apply requests and renders replies.

use crate::app::background::{dispatch_fix, drain_messages, spawn_reanalysis};
use crate::app::host::spawn_fix_host;
use crate::app::input::{self, Action};
use crate::app::messages::BackgroundMessage;
use crate::app::RuntimeContext;
use crate::ui::{self, App};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use linefix_adapters::FileDocument;
use linefix_core::results::Counters;
use linefix_core::{AppliedFix, FixHost, ModelClient, Selection, SessionKey};
use linefix_engine::AnalysisReport;
use ratatui::prelude::*;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};
use tracing::info;

/// Inputs for one results surface.
pub struct TuiParams {
    pub path: PathBuf,
    pub selection: Selection,
    pub report: AnalysisReport,
    pub client: Arc<dyn ModelClient>,
}

/// What happened while the surface was open.
#[derive(Debug)]
pub struct TuiOutcome {
    pub counters: Counters,
    pub applied: Vec<AppliedFix>,
}

/// `file:start-end` with 1-based lines.
pub fn surface_title(path: &Path, selection: &Selection) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    format!(
        "{}:{}-{}",
        name,
        selection.start_line() + 1,
        selection.end_line() + 1
    )
}

/// Open the results surface and run it until the user quits.
pub async fn run_tui(params: TuiParams) -> Result<TuiOutcome> {
    let TuiParams {
        path,
        selection,
        report,
        client,
    } = params;

    let document = FileDocument::open(&path)?;
    let (tx, rx) = mpsc::channel::<BackgroundMessage>();
    let host = spawn_fix_host(FixHost::new(document, selection.span()), tx.clone())?;

    let key = SessionKey::for_selection(&path, &selection);
    let mut app = App::new(key, surface_title(&path, &selection), &report);

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Re-analysis re-reads exactly the lines the host was given.
    let ctx = RuntimeContext {
        path: &path,
        range: Some((selection.start_line() + 1, selection.end_line() + 1)),
        client: &client,
        tx: &tx,
        host: &host,
    };
    let result = run_loop(&mut terminal, &mut app, &rx, &ctx);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Replies still in flight land on a closed surface and are dropped.
    drop(rx);
    let applied = host.shutdown();
    let counters = app.counters();
    info!(
        fixed = counters.fixed,
        total = counters.total,
        applied = applied.len(),
        "results surface closed"
    );

    result?;
    Ok(TuiOutcome { counters, applied })
}

fn run_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: &mpsc::Receiver<BackgroundMessage>,
    ctx: &RuntimeContext,
) -> Result<()> {
    let mut last_spinner_tick = Instant::now();
    let spinner_interval = Duration::from_millis(100);
    let idle_poll_cap = Duration::from_millis(250);
    let mut needs_redraw = true;

    loop {
        // Advance spinner only while loading to avoid idle frame churn.
        if app.loading && last_spinner_tick.elapsed() >= spinner_interval {
            app.tick_loading();
            last_spinner_tick = Instant::now();
            needs_redraw = true;
        }

        if app.clear_expired_toast() {
            needs_redraw = true;
        }

        // Check for background messages (non-blocking)
        if drain_messages(app, rx) {
            needs_redraw = true;
        }
        if app.needs_redraw {
            needs_redraw = true;
        }

        if needs_redraw {
            terminal.draw(|f| ui::render(f, app))?;
            needs_redraw = false;
            app.needs_redraw = false;
        }

        if app.should_quit {
            return Ok(());
        }

        let poll_timeout = if app.loading {
            spinner_interval.saturating_sub(last_spinner_tick.elapsed())
        } else {
            idle_poll_cap
        };

        if event::poll(poll_timeout)? {
            match event::read()? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match input::handle_key(app, key) {
                        Some(Action::Dispatch(message)) => dispatch_fix(app, ctx, message),
                        Some(Action::Reanalyze) => spawn_reanalysis(ctx, app.mode),
                        None => {}
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => needs_redraw = true,
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use linefix_core::{AnalysisMode, LineSpan, MemoryDocument};
    use linefix_engine::analyze_response;
    use ratatui::backend::TestBackend;

    #[test]
    fn test_surface_title_is_one_based() {
        let selection = Selection::new("a\nb", 4).unwrap();
        assert_eq!(surface_title(Path::new("/src/main.c"), &selection), "main.c:5-6");
    }

    #[test]
    fn test_loop_exits_on_quit_after_draining() {
        let raw = r#"[{"relativeLine": 1, "severity": "Error", "finding": "a", "fix": "A"}]"#;
        let report = analyze_response(raw, AnalysisMode::Review);
        let mut app = App::new(SessionKey::new("f.c", 0, 0), "f.c:1-1", &report);
        app.request_apply_selected().unwrap();

        let (tx, rx) = mpsc::channel();
        let host = FixHost::new(MemoryDocument::from_text("a\n"), LineSpan::new(0, 1));
        let host = spawn_fix_host(host, tx.clone()).unwrap();
        tx.send(BackgroundMessage::Host(linefix_core::HostMessage::FixSucceeded {
            relative_line: 1,
        }))
        .unwrap();
        let client: Arc<dyn ModelClient> = Arc::new(NoModel);
        let path = PathBuf::from("f.c");
        let ctx = RuntimeContext {
            path: &path,
            range: None,
            client: &client,
            tx: &tx,
            host: &host,
        };

        input::handle_key(&mut app, KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE));
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        run_loop(&mut terminal, &mut app, &rx, &ctx).unwrap();
        assert_eq!(app.counters().fixed, 1);
    }

    struct NoModel;

    impl ModelClient for NoModel {
        fn complete<'a>(
            &'a self,
            _request: &'a linefix_core::AnalysisRequest,
        ) -> futures::future::BoxFuture<'a, Result<String>> {
            Box::pin(async { Ok("[]".to_string()) })
        }
    }
}
