//! Trash command handlers.

use anyhow::{Context, Result};

use super::print_item_errors;
use crate::cli::output::{Output, OutputFormat};
use crate::cli::{DocumentArgs, EmptyTrashArgs, PurgeArgs};
use crate::{Confirmation, Library};

pub fn handle_trash(args: &DocumentArgs, library: &Library) -> Result<()> {
    let doc = library.find_document(&args.document)?;
    let doc = library
        .trash_document(&doc.id())
        .with_context(|| format!("failed to trash {}", doc))?;
    println!("Trashed: {}", doc);
    Ok(())
}

pub fn handle_restore(args: &DocumentArgs, library: &Library) -> Result<()> {
    let doc = library.find_document(&args.document)?;
    let doc = library
        .restore_document(&doc.id())
        .with_context(|| format!("failed to restore {}", doc))?;
    println!("Restored: {}", doc);
    if let Some(path) = doc.file_path() {
        println!("  {}", path.display());
    }
    Ok(())
}

pub fn handle_purge(args: &PurgeArgs, library: &Library) -> Result<()> {
    let doc = library.find_document(&args.document)?;
    library
        .purge_document(&doc.id(), Confirmation::from_flag(args.yes))
        .with_context(|| format!("failed to purge {} (pass --yes to confirm)", doc))?;
    println!("Purged: {}", doc);
    Ok(())
}

pub fn handle_empty_trash(args: &EmptyTrashArgs, library: &Library) -> Result<()> {
    let report = library
        .empty_trash(Confirmation::from_flag(args.yes))
        .context("failed to empty trash (pass --yes to confirm)")?;

    match args.format {
        OutputFormat::Human => {
            println!(
                "Purged {} document(s), deleted {} other trash file(s)",
                report.purged, report.removed_files
            );
            match &report.backup {
                Some(path) => println!("  backup: {}", path.display()),
                None => println!("  no backup was taken"),
            }
            print_item_errors(&report.errors);
        }
        OutputFormat::Json => Output::new(&report).print()?,
    }
    Ok(())
}
