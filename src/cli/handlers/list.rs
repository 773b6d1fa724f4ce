//! Listing and search command handlers.

use anyhow::{Context, Result};

use super::truncate_str;
use crate::Library;
use crate::cli::output::{DocumentListing, Output, OutputFormat};
use crate::cli::{FormatArgs, ListArgs, SearchArgs};
use crate::index::IndexRecord;

pub fn handle_list(args: &ListArgs, library: &Library) -> Result<()> {
    let mut records = if args.trash {
        library.get_trashed_notes().context("failed to list trash")?
    } else {
        match &args.folder {
            Some(folder) => library
                .get_notes(folder)
                .with_context(|| format!("failed to list folder: {}", folder))?,
            None => library.get_all_notes().context("failed to list documents")?,
        }
    };
    if args.trash
        && let Some(folder) = &args.folder
    {
        records.retain(|r| r.folder().eq_ignore_ascii_case(folder.trim_matches('/')));
    }

    records.sort_by_key(|r| std::cmp::Reverse(r.modified()));
    print_records(&records, args.format)
}

pub fn handle_search(args: &SearchArgs, library: &Library) -> Result<()> {
    let records = library
        .search(&args.query)
        .with_context(|| format!("search failed: {}", args.query))?;
    print_records(&records, args.format)
}

fn print_records(records: &[IndexRecord], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => {
            if records.is_empty() {
                println!("No documents found.");
                return Ok(());
            }
            println!(
                "{:<10}  {:<40}  {:<24}  {:>7}  {:>10}",
                "ID", "Title", "Folder", "Words", "Modified"
            );
            println!(
                "{:<10}  {:<40}  {:<24}  {:>7}  {:>10}",
                "----------",
                "----------------------------------------",
                "------------------------",
                "-------",
                "----------"
            );
            for record in records {
                let missing = if record.is_missing() { " (missing)" } else { "" };
                println!(
                    "{:<10}  {:<40}  {:<24}  {:>7}  {:>10}{}",
                    record.id().prefix(),
                    truncate_str(record.title(), 40),
                    truncate_str(record.folder(), 24),
                    record.word_count(),
                    record.modified().format("%Y-%m-%d"),
                    missing
                );
            }
            println!();
            println!("{} document(s)", records.len());
        }
        OutputFormat::Json => {
            let listings: Vec<DocumentListing> = records.iter().map(Into::into).collect();
            Output::new(listings).print()?;
        }
    }
    Ok(())
}

pub fn handle_folders(args: &FormatArgs, library: &Library) -> Result<()> {
    let folders = library.get_all_folders().context("failed to list folders")?;
    match args.format {
        OutputFormat::Human => {
            if folders.is_empty() {
                println!("No folders.");
            }
            for folder in &folders {
                println!("{}", folder);
            }
        }
        OutputFormat::Json => Output::new(folders).print()?,
    }
    Ok(())
}

pub fn handle_files(args: &FormatArgs, library: &Library) -> Result<()> {
    let files = library.scan_all_files().context("failed to scan files")?;
    match args.format {
        OutputFormat::Human => {
            for path in &files {
                println!("{}", path.display());
            }
        }
        OutputFormat::Json => Output::new(files).print()?,
    }
    Ok(())
}
