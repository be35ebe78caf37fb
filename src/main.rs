use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Result};
use clap::Parser;
use rusqlite::Connection;

use neatstep::cli::{Cli, Commands};
use neatstep::data::repository;
use neatstep::error::AppError;
use neatstep::models::activity::{ActionKind, ActionStatus, ActivityLogEntry};
use neatstep::models::analysis::{AnalysisReport, FileAnalysis};
use neatstep::services::classify_service::{self, GeminiClassifier};
use neatstep::services::insight_service;
use neatstep::services::organize_service;
use neatstep::services::permission_service;
use neatstep::services::review_service::{ItemState, ReviewState, FORCE_NEW_STRATEGY_FEEDBACK};
use neatstep::services::scan_service::{self, ScanResult};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let (conn, db_path) = neatstep::init_db()?;

    match cli.command {
        Commands::Scan { root } => run_scan(&conn, &root, cli.allow),
        Commands::Organize { root, sweep } => {
            run_organize(&conn, &db_path, &root, cli.allow, sweep).await
        }
        Commands::Grant { path } => {
            permission_service::grant(&conn, &path.to_string_lossy())?;
            println!("Granted: {}", path.display());
            Ok(())
        }
        Commands::Revoke { path } => {
            if permission_service::revoke(&conn, &path.to_string_lossy())? {
                println!("Revoked: {}", path.display());
            } else {
                println!("No grant found for {}", path.display());
            }
            Ok(())
        }
        Commands::History { limit } => run_history(&conn, limit),
        Commands::ClearHistory => {
            repository::clear_logs(&conn);
            println!("Activity history cleared.");
            Ok(())
        }
        Commands::Stats => run_stats(&conn),
        Commands::SetKey { key } => {
            repository::set_setting(&conn, "api_key", &key)?;
            println!("API key stored.");
            Ok(())
        }
    }
}

fn run_scan(conn: &Connection, root: &Path, allow_once: bool) -> Result<()> {
    let result = scan_tree(conn, root, allow_once)?;

    for file in &result.files {
        let marker = if file.content_snippet.is_some() { "text" } else { "    " };
        println!(
            "{:>10}  {marker}  {}",
            format_size(file.size_bytes),
            file.relative_path
        );
    }
    println!(
        "\n{} files, {} total{}",
        result.files.len(),
        format_size(result.total_bytes()),
        if result.skipped_entries > 0 {
            format!(" ({} entries unreadable)", result.skipped_entries)
        } else {
            String::new()
        }
    );
    Ok(())
}

async fn run_organize(
    conn: &Connection,
    db_path: &Path,
    root: &Path,
    allow_once: bool,
    sweep: bool,
) -> Result<()> {
    let scan = scan_tree(conn, root, allow_once)?;
    if scan.files.is_empty() {
        println!("Nothing to organize: the folder has no files.");
        return Ok(());
    }
    println!("Indexed {} files under {}", scan.files.len(), root.display());

    let classifier = build_classifier(conn)?;

    // Dashboard insights refresh on the side; its outcome gates nothing.
    tokio::spawn(insight_service::refresh_insights(
        db_path.to_path_buf(),
        classifier.clone(),
        repository::get_stats(conn),
        scan.files.clone(),
    ));

    let mut report = analyze_logged(conn, &classifier, &scan, None).await?;

    if report.is_already_organized
        && prompt_confirm(
            "This folder already looks organized. Try a different strategy anyway?",
            Some(false),
        )?
    {
        report = analyze_logged(conn, &classifier, &scan, Some(FORCE_NEW_STRATEGY_FEEDBACK)).await?;
    }

    let selected = loop {
        match review_report(&report)? {
            ReviewOutcome::Execute(selected) => break selected,
            ReviewOutcome::Refine(feedback) => {
                report = analyze_logged(conn, &classifier, &scan, Some(&feedback)).await?;
            }
            ReviewOutcome::Quit => {
                println!("Left the analysis unapplied.");
                return Ok(());
            }
        }
    };

    if selected.is_empty() {
        println!("Nothing selected; no files were moved.");
        return Ok(());
    }

    let mut log_sink = |entry: ActivityLogEntry| repository::append_log(conn, &entry);
    let summary = organize_service::apply(root, &scan.files, &selected, &mut log_sink);
    repository::append_log(
        conn,
        &ActivityLogEntry::new(
            ActionKind::Move,
            format!(
                "Automation cycle complete: {} files relocated, {} failed.",
                summary.files_moved, summary.failed
            ),
            ActionStatus::Success,
        ),
    );

    let stats = repository::get_stats(conn).absorb(&summary, scan.total_bytes());
    repository::put_stats(conn, &stats);

    if sweep {
        let removed = organize_service::remove_empty_dirs(root);
        if removed > 0 {
            println!("Swept {removed} empty folders.");
        }
    }

    // Refresh the file list so the next cycle starts from reality.
    let refreshed = scan_tree(conn, root, allow_once)?;

    println!(
        "\nMoved {} files ({} junk) into {} folders; {} failed. {} files remain in {}.",
        summary.files_moved,
        summary.junk_moved,
        summary.folders_created,
        summary.failed,
        refreshed.files.len(),
        root.display()
    );
    Ok(())
}

fn run_history(conn: &Connection, limit: usize) -> Result<()> {
    let logs = repository::get_all_logs(conn);
    if logs.is_empty() {
        println!("No activity recorded yet.");
        return Ok(());
    }
    for entry in logs.iter().take(limit) {
        println!(
            "{}  {:<7} {:<7} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.action.to_string(),
            entry.status.to_string(),
            entry.details
        );
    }
    Ok(())
}

fn run_stats(conn: &Connection) -> Result<()> {
    let stats = repository::get_stats(conn);
    println!("Files analyzed : {}", stats.files_analyzed);
    println!("Junk found     : {}", stats.junk_found);
    println!("Space analyzed : {}", format_size(stats.space_analyzed));
    println!("Folders created: {}", stats.folders_created);
    if !stats.ai_insights.is_empty() {
        println!("\nInsights:");
        for insight in &stats.ai_insights {
            println!("  - {}: {}", insight.title, insight.description);
        }
    }
    Ok(())
}

fn scan_tree(conn: &Connection, root: &Path, allow_once: bool) -> Result<ScanResult, AppError> {
    let scopes = repository::get_permission_scopes(conn)?;
    let default_mode = permission_service::resolve_default_mode(conn)?;
    let result = scan_service::scan(root, &scopes, default_mode, allow_once)?;
    repository::append_log(
        conn,
        &ActivityLogEntry::new(
            ActionKind::Scan,
            format!(
                "Deep scan completed in {}. Indexed {} nodes.",
                root.display(),
                result.files.len()
            ),
            ActionStatus::Success,
        ),
    );
    Ok(result)
}

fn build_classifier(conn: &Connection) -> Result<GeminiClassifier> {
    let api_key = match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => key,
        _ => match repository::get_setting(conn, "api_key")? {
            Some(key) => key,
            None => bail!(
                "no API key configured; set GEMINI_API_KEY or run `neatstep set-key <key>`"
            ),
        },
    };
    let model = repository::get_setting(conn, "model")?;
    Ok(GeminiClassifier::new(api_key, model))
}

async fn analyze_logged(
    conn: &Connection,
    classifier: &GeminiClassifier,
    scan: &ScanResult,
    feedback: Option<&str>,
) -> Result<AnalysisReport> {
    println!("Analyzing {} files in batches of {}...", scan.files.len(), classify_service::BATCH_SIZE);
    let report = classify_service::analyze(classifier, &scan.files, feedback).await?;
    let action = if feedback.is_some() {
        ActionKind::Refine
    } else {
        ActionKind::Consult
    };
    repository::append_log(
        conn,
        &ActivityLogEntry::new(
            action,
            format!(
                "Analysis complete. Strategy applied to {} nodes.",
                report.analyses.len()
            ),
            ActionStatus::Success,
        ),
    );
    Ok(report)
}

enum ReviewOutcome {
    Execute(Vec<FileAnalysis>),
    Refine(String),
    Quit,
}

fn review_report(report: &AnalysisReport) -> io::Result<ReviewOutcome> {
    let mut state = ReviewState::new(report);

    println!("\n== {} ==", report.summary);
    println!("Strategy: {}", report.strategy);
    println!("Impact score: {}/100", report.impact_score);

    loop {
        print_items(report, &state);
        println!(
            "\n{} selected. Commands: <n> toggle, grant <n>, all, refine <text>, go, quit",
            state.selection_count()
        );
        let input = prompt_line("> ")?;
        let (command, rest) = match input.split_once(' ') {
            Some((head, tail)) => (head, tail.trim()),
            None => (input.as_str(), ""),
        };

        match command {
            "" => continue,
            "go" => return Ok(ReviewOutcome::Execute(state.take_selected(report))),
            "quit" | "q" => return Ok(ReviewOutcome::Quit),
            "all" => state.select_all(),
            "refine" => {
                if rest.is_empty() {
                    println!("Usage: refine <how you want the files organized>");
                } else {
                    return Ok(ReviewOutcome::Refine(rest.to_string()));
                }
            }
            "grant" => match item_at(report, rest) {
                Some(item) => state.grant_consent(&item.original_name),
                None => println!("No such item: {rest}"),
            },
            number => match item_at(report, number) {
                Some(item) => {
                    if state.state_of(&item.original_name) == ItemState::Locked {
                        println!(
                            "{} contains sensitive data (API keys or passwords). \
                             Use `grant {number}` to allow organizing it.",
                            item.original_name
                        );
                    } else {
                        state.toggle(&item.original_name);
                    }
                }
                None => println!("Unknown command: {input}"),
            },
        }
    }
}

fn item_at<'a>(report: &'a AnalysisReport, index_text: &str) -> Option<&'a FileAnalysis> {
    let index: usize = index_text.parse().ok()?;
    report.analyses.get(index.checked_sub(1)?)
}

fn print_items(report: &AnalysisReport, state: &ReviewState) {
    for (index, item) in report.analyses.iter().enumerate() {
        let marker = match state.state_of(&item.original_name) {
            ItemState::Selected => "[x]",
            ItemState::Unselected => "[ ]",
            ItemState::Locked => "[!]",
        };
        let junk = if item.is_junk { " (junk)" } else { "" };
        let folder = match item.suggested_folder.trim_matches('/') {
            "" | "." => "root".to_string(),
            folder => folder.to_string(),
        };
        println!(
            "{marker} {:>3}. {} -> /{folder}/{}{junk}",
            index + 1,
            item.original_name,
            item.suggested_name
        );
        if !item.reason.is_empty() {
            println!(
                "         {} ({:.0}%): {}",
                item.category,
                item.confidence * 100.0,
                item.reason
            );
        }
    }
}

fn prompt_line(prompt: &str) -> io::Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    loop {
        let suffix = match default {
            Some(true) => "(Y/n)",
            Some(false) | None => "(y/N)",
        };
        let input = prompt_line(&format!("{prompt} {suffix}: "))?;
        match input.to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}

fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[0])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
