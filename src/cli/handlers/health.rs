//! Health, statistics and integrity command handlers.

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::Library;
use crate::cli::output::{Output, OutputFormat};
use crate::cli::{FormatArgs, HealthArgs};
use crate::domain::{Severity, StorageStats};
use crate::maintenance::MaintenanceReport;

pub fn handle_health(args: &HealthArgs, library: &Library) -> Result<()> {
    let report = if args.full || args.fix {
        library
            .run_full_maintenance(args.fix)
            .context("maintenance failed")?
    } else {
        library.quick_health_check().context("health check failed")?
    };

    match args.format {
        OutputFormat::Human => print_report(&report),
        OutputFormat::Json => Output::new(&report).print()?,
    }

    // Only critical issues fail the command.
    if report.has_critical() {
        bail!("health check found critical issues");
    }
    Ok(())
}

fn print_report(report: &MaintenanceReport) {
    for issue in &report.fixed {
        println!("fixed: {}", issue.description);
    }
    for error in &report.errors {
        eprintln!("fix failed: {}", error);
    }
    if report.is_healthy() {
        println!("All documents OK.");
        return;
    }

    let mut issues: Vec<_> = report.issues.iter().collect();
    issues.sort_by_key(|i| std::cmp::Reverse(i.severity));
    for issue in &issues {
        let hint = if issue.can_auto_fix { " (fixable)" } else { "" };
        println!("{}: {}{}", issue.severity, issue.description, hint);
    }
    println!(
        "\nFound {} issue(s): {} critical, {} fixable",
        issues.len(),
        report.count_at_least(Severity::Critical),
        report.auto_fixable().count()
    );
}

#[derive(Debug, Serialize)]
struct StatsOutput {
    storage: StorageStats,
    words: u64,
    last_sync: Option<chrono::DateTime<chrono::Utc>>,
}

pub fn handle_stats(args: &FormatArgs, library: &Library) -> Result<()> {
    let stats = StatsOutput {
        storage: library.get_storage_stats().context("failed to read stats")?,
        words: library.total_word_count()?,
        last_sync: library.last_sync()?,
    };

    match args.format {
        OutputFormat::Human => {
            let s = &stats.storage;
            println!("Documents: {}", s.total);
            println!("  file-backed:     {}", s.file_backed);
            println!("  repository-only: {}", s.repository_only);
            println!("  hybrid:          {}", s.hybrid);
            println!("  empty:           {}", s.empty);
            println!("Trashed:   {}", s.trashed);
            println!("Words:     {}", stats.words);
            match stats.last_sync {
                Some(at) => println!("Last sync: {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
                None => println!("Last sync: never"),
            }
        }
        OutputFormat::Json => Output::new(&stats).print()?,
    }
    Ok(())
}

pub fn handle_verify(args: &FormatArgs, library: &Library) -> Result<()> {
    let integrity = library
        .verify_file_integrity()
        .context("failed to verify files")?;

    match args.format {
        OutputFormat::Human => println!(
            "{} file(s) present, {} missing",
            integrity.valid, integrity.missing
        ),
        OutputFormat::Json => Output::new(integrity).print()?,
    }

    if integrity.missing > 0 {
        bail!("{} recorded file(s) are missing", integrity.missing);
    }
    Ok(())
}
