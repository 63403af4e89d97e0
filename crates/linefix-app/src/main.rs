//! linefix - AI review for a range of lines, with one-key fixes.
//!
//! Sends the selected lines to a model, validates what comes back, and lets
//! you apply each proposed fix to its line.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use linefix_adapters::config::{self, Config};
use linefix_adapters::{keyring, logging, FileDocument};
use linefix_core::results::Counters;
use linefix_core::{
    AnalysisError, AnalysisMode, FixHost, HostMessage, ModelClient, ResultsSession, Selection,
};
use linefix_engine::{run_analysis, AnalysisReport, OpenRouterClient};
use linefix_ui::spinner::{spin_until, Spinner};
use linefix_ui::{run_tui, TuiParams};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// 1-based inclusive line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineRange {
    start: usize,
    end: usize,
}

fn parse_line_range(raw: &str) -> Result<LineRange, String> {
    let raw = raw.trim();
    let (start, end) = match raw.split_once([':', '-']) {
        Some((start, end)) => (start.trim(), end.trim()),
        None => (raw, raw),
    };
    let parse = |s: &str| {
        s.parse::<usize>()
            .map_err(|_| format!("`{}` is not a line number", s))
    };
    let (start, end) = (parse(start)?, parse(end)?);
    if start == 0 {
        return Err("line numbers start at 1".to_string());
    }
    if end < start {
        return Err(format!("range {}:{} ends before it starts", start, end));
    }
    Ok(LineRange { start, end })
}

fn parse_mode(raw: &str) -> Result<AnalysisMode, String> {
    raw.parse()
}

#[derive(Parser, Debug)]
#[command(
    name = "linefix",
    about = "AI review for a range of lines, with one-key fixes",
    long_about = "L I N E F I X\n\n\
                  Sends the selected lines to a model on OpenRouter, shows the\n\
                  findings it returns, and applies each proposed fix to its line.",
    version
)]
struct Args {
    /// File to analyze
    #[arg(required_unless_present = "setup")]
    file: Option<PathBuf>,

    /// Lines to analyze, 1-based inclusive (e.g. 10:42). Defaults to the whole file
    #[arg(long, value_parser = parse_line_range)]
    lines: Option<LineRange>,

    /// Analysis to run: review or edge-cases
    #[arg(long, value_parser = parse_mode)]
    mode: Option<AnalysisMode>,

    /// OpenRouter model id for this run
    #[arg(long)]
    model: Option<String>,

    /// Apply every actionable fix without opening the results view
    #[arg(long, conflicts_with = "json")]
    apply_all: bool,

    /// Print findings as JSON and exit without editing
    #[arg(long)]
    json: bool,

    /// Set up OpenRouter API key
    #[arg(long)]
    setup: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.setup {
        return setup_api_key();
    }
    let Some(file) = args.file.clone() else {
        return Err(anyhow!("No file given. Run 'linefix --help' for usage."));
    };

    let interactive = !args.json && !args.apply_all;
    init_logging(interactive);

    let mut config = Config::load();
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    let mode = args.mode.unwrap_or(config.default_mode);

    let path = file
        .canonicalize()
        .with_context(|| format!("Cannot open {}", file.display()))?;
    let document = FileDocument::open(&path)?;
    let range = args.lines.map(|r| (r.start, r.end));
    if let Some((_, end)) = range {
        if end > document.lines().len() {
            return Err(anyhow!(
                "{} has {} lines; range ends at line {}",
                path.display(),
                document.lines().len(),
                end
            ));
        }
    }
    let selection = match document.select(range) {
        Ok(selection) => selection,
        Err(err) => {
            eprintln!("  {}", err);
            return Ok(());
        }
    };

    let openrouter = Arc::new(OpenRouterClient::from_config(&mut config)?);
    let report = analyze(openrouter.as_ref(), &selection, mode).await;
    if let Some(usage) = openrouter.last_usage() {
        info!(
            model = openrouter.model(),
            tokens = usage.total_tokens,
            cost = usage.cost(),
            "analysis usage"
        );
    }
    let client: Arc<dyn ModelClient> = openrouter;

    if args.json {
        return print_json(&report);
    }

    match &report.error {
        Some(err @ AnalysisError::ModelCall(_)) => return Err(anyhow!("{}", err)),
        Some(_) => return Ok(()),
        None => {}
    }
    if report.is_no_issues() {
        return Ok(());
    }

    if args.apply_all {
        let counters = apply_all(&path, &selection, &report)?;
        println!(
            "  Fixed {}/{} findings in {}",
            counters.fixed,
            counters.total,
            path.display()
        );
        return Ok(());
    }

    let outcome = run_tui(TuiParams {
        path: path.clone(),
        selection,
        report,
        client,
    })
    .await?;

    let counters = outcome.counters;
    println!();
    println!(
        "  Fixed {}/{} findings in {}",
        counters.fixed,
        counters.total,
        path.display()
    );
    for fix in &outcome.applied {
        println!("    line {}: {}", fix.absolute_line + 1, fix.new_text.trim());
    }
    println!();
    Ok(())
}

/// Logs go to stderr unless the results view will own the terminal.
fn init_logging(interactive: bool) {
    let result = if !interactive {
        logging::init_stderr()
    } else if let Some(dir) = Config::config_dir() {
        logging::init_file(&dir).map(|_| ())
    } else {
        return;
    };
    if let Err(err) = result {
        eprintln!("  ! Logging disabled: {:#}", err);
    }
}

/// Run the analysis behind a spinner. The call cannot be cancelled.
async fn analyze(
    client: &dyn ModelClient,
    selection: &Selection,
    mode: AnalysisMode,
) -> AnalysisReport {
    if !std::io::stderr().is_terminal() {
        let report = run_analysis(client, selection, mode).await;
        if let Some(notice) = report.notice() {
            eprintln!("  {}", notice);
        }
        return report;
    }

    let mut spinner = Spinner::new(&format!(
        "{} ({} lines)...",
        mode.progress_title(),
        selection.line_count()
    ));
    spinner.start();
    let report = spin_until(&mut spinner, run_analysis(client, selection, mode)).await;

    match &report.error {
        None if report.is_no_issues() => spinner.finish_with_message("No issues found"),
        None => spinner.finish_with_message(&summary(&report)),
        Some(AnalysisError::ModelCall(_)) => spinner.finish_with_error("Model call failed"),
        Some(err) => spinner.finish_with_error(&err.to_string()),
    }
    report
}

fn summary(report: &AnalysisReport) -> String {
    let mut text = match report.mode {
        AnalysisMode::Review => format!(
            "{} finding(s), {} fixable",
            report.findings.len(),
            report.findings.actionable_count()
        ),
        AnalysisMode::EdgeCases => format!("{} edge case(s)", report.edge_cases.len()),
    };
    if !report.rejected().is_empty() {
        text.push_str(&format!(", {} malformed item(s) skipped", report.rejected().len()));
    }
    text
}

fn print_json(report: &AnalysisReport) -> Result<()> {
    let counters = ResultsSession::new(&report.findings).counters();
    let mut value = serde_json::to_value(report)?;
    value["counters"] = serde_json::to_value(counters)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// Apply every actionable finding through the fix host, in row order.
fn apply_all(path: &Path, selection: &Selection, report: &AnalysisReport) -> Result<Counters> {
    let document = FileDocument::open(path)?;
    let mut host = FixHost::new(document, selection.span());
    let mut session = ResultsSession::new(&report.findings);

    for index in 0..session.total() {
        let Some(request) = session.request_apply(index) else {
            continue;
        };
        let reply = host.handle(request);
        let line = selection.start_line() + reply.relative_line();
        match &reply {
            HostMessage::FixSucceeded { .. } => eprintln!("  ✓ line {}", line),
            HostMessage::FixFailed { reason, .. } => eprintln!("  ✗ line {}: {}", line, reason),
        }
        session.handle(&reply);
    }

    let counters = session.counters();
    info!(fixed = counters.fixed, total = counters.total, "apply-all finished");
    Ok(counters)
}

/// Set up the API key interactively
fn setup_api_key() -> Result<()> {
    config::setup_api_key_interactive()?;

    if Config::load().has_api_key() {
        println!("  + API key verified and ready to use!");
        println!("  Settings: {}", Config::config_location());
        return Ok(());
    }

    eprintln!();
    eprintln!("  ! Warning: API key was saved but cannot be read back.");
    eprintln!(
        "  ! This may be due to {} access issues.",
        keyring::credentials_store_label()
    );
    eprintln!();
    eprintln!("  Workaround: Set the OPENROUTER_API_KEY environment variable:");
    eprintln!("    export OPENROUTER_API_KEY=\"your-key-here\"");
    eprintln!();
    Err(anyhow!("API key verification failed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use linefix_engine::analyze_response;
    use std::fs;

    #[test]
    fn test_parse_line_range() {
        assert_eq!(parse_line_range("3:7"), Ok(LineRange { start: 3, end: 7 }));
        assert_eq!(parse_line_range("3-7"), Ok(LineRange { start: 3, end: 7 }));
        assert_eq!(parse_line_range(" 5 "), Ok(LineRange { start: 5, end: 5 }));
        assert!(parse_line_range("0:4").is_err());
        assert!(parse_line_range("7:3").is_err());
        assert!(parse_line_range("a:b").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "linefix",
            "main.c",
            "--lines",
            "2:4",
            "--mode",
            "edge-cases",
            "--json",
        ])
        .unwrap();
        assert_eq!(args.file, Some(PathBuf::from("main.c")));
        assert_eq!(args.lines, Some(LineRange { start: 2, end: 4 }));
        assert_eq!(args.mode, Some(AnalysisMode::EdgeCases));
        assert!(args.json);

        assert!(Args::try_parse_from(["linefix"]).is_err());
        assert!(Args::try_parse_from(["linefix", "--setup"]).is_ok());
        assert!(Args::try_parse_from(["linefix", "f.c", "--json", "--apply-all"]).is_err());
        assert!(Args::try_parse_from(["linefix", "f.c", "--mode", "lint"]).is_err());
    }

    #[test]
    fn test_apply_all_fixes_every_actionable_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.c");
        fs::write(&path, "#include <stdio.h>\nint x\nprintf(\"%d\", x)\nreturn 0;\n").unwrap();

        let document = FileDocument::open(&path).unwrap();
        let selection = document.select(Some((2, 3))).unwrap();
        let raw = r#"[
            {"relativeLine": 2, "severity": "Error", "finding": "missing semicolon", "fix": "printf(\"%d\\n\", x);"},
            {"relativeLine": 1, "severity": "Warning", "finding": "uninitialized", "fix": "int x = 0;"},
            {"relativeLine": 1, "severity": "Info", "finding": "naming", "fix": "int count = 0;"},
            {"relativeLine": 3, "severity": "Error", "finding": "past selection", "fix": "return 1;"}
        ]"#;
        let report = analyze_response(raw, AnalysisMode::Review);

        let counters = apply_all(&path, &selection, &report).unwrap();
        assert_eq!(counters.total, 3);
        assert_eq!(counters.fixed, 2);
        assert_eq!(counters.remaining, 1);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "#include <stdio.h>\nint x = 0;\nprintf(\"%d\\n\", x);\nreturn 0;\n"
        );
    }

    #[test]
    fn test_summary_mentions_skipped_items() {
        let raw = r#"[{"relativeLine": 1, "severity": "Error", "finding": "a", "fix": "b"}, {"oops": true}]"#;
        let report = analyze_response(raw, AnalysisMode::Review);
        assert_eq!(summary(&report), "1 finding(s), 1 fixable, 1 malformed item(s) skipped");
    }
}
