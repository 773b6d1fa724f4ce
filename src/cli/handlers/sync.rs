//! Sync, index and migration command handlers.

use anyhow::{Context, Result};

use super::{ConsoleReporter, print_item_errors};
use crate::Library;
use crate::cli::output::{Output, OutputFormat};
use crate::cli::{FormatArgs, IndexArgs, SyncArgs};
use crate::sync::SyncReport;

pub fn handle_sync(args: &SyncArgs, library: &Library, verbose: bool) -> Result<()> {
    let mut reporter = ConsoleReporter::new(verbose);
    let report = if args.full {
        library
            .perform_full_sync_with_progress(&mut reporter)
            .context("full sync failed")?
    } else {
        library
            .perform_quick_sync_with_progress(&mut reporter)
            .context("quick sync failed")?
    };

    match args.format {
        OutputFormat::Human => print_sync_report(&report),
        OutputFormat::Json => Output::new(&report).print()?,
    }
    Ok(())
}

fn print_sync_report(report: &SyncReport) {
    let stats = report.stats;
    println!(
        "Synced: {} indexed, {} updated, {} removed",
        stats.files_indexed, stats.files_updated, stats.files_removed
    );
    if report.cancelled {
        println!("  (cancelled before finishing)");
    }
    for path in &report.orphans {
        println!("  orphaned file: {}", path.display());
    }
    for id in &report.drift {
        println!("  content drift: {}", id.prefix());
    }
    for id in &report.duplicates {
        println!("  duplicate identifier: {}", id);
    }
    print_item_errors(&report.errors);
}

pub fn handle_index(args: &IndexArgs, library: &Library, verbose: bool) -> Result<()> {
    let mut reporter = ConsoleReporter::new(verbose);
    if !args.from_files {
        let report = library
            .perform_full_sync_with_progress(&mut reporter)
            .context("failed to refresh index")?;
        match args.format {
            OutputFormat::Human => print_sync_report(&report),
            OutputFormat::Json => Output::new(&report).print()?,
        }
        return Ok(());
    }

    let result = library
        .rebuild_index_from_files(&mut reporter)
        .context("failed to rebuild index from files")?;

    match args.format {
        OutputFormat::Human => {
            println!("Indexed {} document(s) from files", result.indexed);
            for (id, paths) in &result.duplicates {
                println!("  duplicate identifier {}:", id);
                for path in paths {
                    println!("    {}", path.display());
                }
            }
            for error in &result.errors {
                eprintln!("  {}", error);
            }
        }
        OutputFormat::Json => {
            let errors: Vec<String> = result.errors.iter().map(ToString::to_string).collect();
            Output::new(serde_json::json!({
                "indexed": result.indexed,
                "duplicates": result.duplicates,
                "errors": errors,
            }))
            .print()?;
        }
    }
    Ok(())
}

pub fn handle_migrate(args: &FormatArgs, library: &Library) -> Result<()> {
    let summary = library
        .migrate_to_new_file_structure()
        .context("migration failed")?;

    match args.format {
        OutputFormat::Human => println!(
            "Migrated: {} moved or written, {} already in place, {} failed",
            summary.success, summary.skipped, summary.failed
        ),
        OutputFormat::Json => Output::new(summary).print()?,
    }
    Ok(())
}
