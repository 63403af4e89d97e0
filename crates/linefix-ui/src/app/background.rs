//! Background work for the results surface.
//!
//! Channel sends use `let _ =`: a failed send means the surface has been
//! closed and the result has nowhere to go.

use crate::app::messages::BackgroundMessage;
use crate::app::RuntimeContext;
use crate::ui::{App, ToastLevel};
use futures::FutureExt;
use linefix_adapters::FileDocument;
use linefix_core::{AnalysisMode, HostMessage, SurfaceMessage};
use linefix_engine::{run_analysis, AnalysisReport};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{mpsc, Arc};
use tracing::{info, warn};

/// Apply everything waiting on the channel. Returns whether anything changed.
pub fn drain_messages(app: &mut App, rx: &mpsc::Receiver<BackgroundMessage>) -> bool {
    let mut changed = false;
    while let Ok(msg) = rx.try_recv() {
        changed = true;
        match msg {
            BackgroundMessage::Host(reply) => app.apply_host_message(&reply),
            BackgroundMessage::AnalysisReady(report) => {
                info!(
                    findings = report.findings.actionable_count(),
                    edge_cases = report.edge_cases.len(),
                    "re-analysis finished"
                );
                app.load_report(&report);
            }
            BackgroundMessage::Error(e) => {
                app.loading = false;
                app.show_toast(e, ToastLevel::Error);
            }
        }
    }
    changed
}

/// Hand an apply request to the fix host. If the host is gone, the row is
/// resolved as failed right away so it does not stay in `Applying`.
pub fn dispatch_fix(app: &mut App, ctx: &RuntimeContext, message: SurfaceMessage) {
    let relative_line = message.relative_line();
    if !ctx.host.dispatch(message) {
        warn!(relative_line, "fix host is not running");
        app.apply_host_message(&HostMessage::FixFailed {
            relative_line,
            reason: "Fix host is not running".to_string(),
        });
    }
}

pub fn spawn_background<F>(tx: mpsc::Sender<BackgroundMessage>, task_name: &'static str, fut: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(panic) = AssertUnwindSafe(fut).catch_unwind().await {
            let detail = if let Some(s) = panic.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic payload".to_string()
            };
            let _ = tx.send(BackgroundMessage::Error(format!(
                "Background task '{}' crashed unexpectedly: {}",
                task_name, detail
            )));
        }
    });
}

/// Re-read the file, re-select the same range and analyze it again.
pub fn spawn_reanalysis(ctx: &RuntimeContext, mode: AnalysisMode) {
    let path = ctx.path.to_path_buf();
    let range = ctx.range;
    let client = Arc::clone(ctx.client);
    let tx = ctx.tx.clone();

    spawn_background(ctx.tx.clone(), "reanalysis", async move {
        let document = match FileDocument::open(&path) {
            Ok(document) => document,
            Err(e) => {
                let _ = tx.send(BackgroundMessage::Error(format!("{:#}", e)));
                return;
            }
        };
        let report = match document.select(range) {
            Ok(selection) => run_analysis(client.as_ref(), &selection, mode).await,
            Err(err) => AnalysisReport::from_error(mode, err),
        };
        let _ = tx.send(BackgroundMessage::AnalysisReady(Box::new(report)));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::host::spawn_fix_host;
    use anyhow::Result;
    use futures::future::BoxFuture;
    use linefix_core::{
        AnalysisRequest, FixHost, LineSpan, MemoryDocument, ModelClient, SessionKey,
    };
    use linefix_engine::analyze_response;
    use std::time::Duration;

    struct FixedReply(&'static str);

    impl ModelClient for FixedReply {
        fn complete<'a>(&'a self, _request: &'a AnalysisRequest) -> BoxFuture<'a, Result<String>> {
            Box::pin(async move { Ok(self.0.to_string()) })
        }
    }

    const REPLY: &str =
        r#"[{"relativeLine": 1, "severity": "Error", "finding": "a", "fix": "int x = 0;"}]"#;

    fn app() -> App {
        App::new(
            SessionKey::new("f.c", 0, 1),
            "f.c:1-2",
            &analyze_response(REPLY, AnalysisMode::Review),
        )
    }

    #[test]
    fn test_drain_applies_host_replies() {
        let mut app = app();
        app.request_apply_selected().unwrap();
        let (tx, rx) = mpsc::channel();
        tx.send(BackgroundMessage::Host(HostMessage::FixSucceeded { relative_line: 1 }))
            .unwrap();
        tx.send(BackgroundMessage::Host(HostMessage::FixSucceeded { relative_line: 1 }))
            .unwrap();

        assert!(drain_messages(&mut app, &rx));
        assert_eq!(app.counters().fixed, 1);
        assert!(!drain_messages(&mut app, &rx));
    }

    #[test]
    fn test_drain_error_clears_loading() {
        let mut app = app();
        app.start_loading();
        let (tx, rx) = mpsc::channel();
        tx.send(BackgroundMessage::Error("boom".to_string())).unwrap();
        drain_messages(&mut app, &rx);
        assert!(!app.loading);
        assert_eq!(app.toast.as_ref().unwrap().level, ToastLevel::Error);
    }

    #[test]
    fn test_dispatch_round_trip_through_host() {
        let mut app = app();
        let (tx, rx) = mpsc::channel();
        let doc = MemoryDocument::from_text("int x\nreturn x;\n");
        let host = spawn_fix_host(FixHost::new(doc, LineSpan::new(0, 2)), tx.clone()).unwrap();
        let client: Arc<dyn ModelClient> = Arc::new(FixedReply("[]"));
        let path = std::path::PathBuf::from("f.c");
        let ctx = RuntimeContext {
            path: &path,
            range: None,
            client: &client,
            tx: &tx,
            host: &host,
        };

        let message = app.request_apply_selected().unwrap();
        dispatch_fix(&mut app, &ctx, message);
        assert!(!app.session().unwrap().rows()[0].can_apply());

        for _ in 0..100 {
            if drain_messages(&mut app, &rx) {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(app.counters().fixed, 1);

        let applied = host.shutdown();
        assert_eq!(applied[0].new_text, "int x = 0;");
    }

    #[tokio::test]
    async fn test_reanalysis_reads_file_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.c");
        std::fs::write(&path, "int x\nreturn x;\n").unwrap();

        let (tx, rx) = mpsc::channel();
        let host = FixHost::new(MemoryDocument::from_text(""), LineSpan::new(0, 1));
        let host = spawn_fix_host(host, tx.clone()).unwrap();
        let client: Arc<dyn ModelClient> = Arc::new(FixedReply(REPLY));
        let ctx = RuntimeContext {
            path: &path,
            range: Some((1, 2)),
            client: &client,
            tx: &tx,
            host: &host,
        };

        let mut app = app();
        app.start_loading();
        spawn_reanalysis(&ctx, AnalysisMode::Review);

        let mut received = false;
        for _ in 0..100 {
            if drain_messages(&mut app, &rx) {
                received = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(received);
        assert!(!app.loading);
        assert_eq!(app.counters().total, 1);
        assert_eq!(app.toast.as_ref().unwrap().message, "Results refreshed");
    }

    #[tokio::test]
    async fn test_reanalysis_of_missing_file_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.c");

        let (tx, rx) = mpsc::channel();
        let host = FixHost::new(MemoryDocument::from_text(""), LineSpan::new(0, 1));
        let host = spawn_fix_host(host, tx.clone()).unwrap();
        let client: Arc<dyn ModelClient> = Arc::new(FixedReply("[]"));
        let ctx = RuntimeContext {
            path: &path,
            range: None,
            client: &client,
            tx: &tx,
            host: &host,
        };

        let mut app = app();
        app.start_loading();
        spawn_reanalysis(&ctx, AnalysisMode::Review);

        for _ in 0..100 {
            if drain_messages(&mut app, &rx) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!app.loading);
        assert!(app.toast.as_ref().unwrap().message.contains("Failed to read"));
    }
}
