//! Document command handlers.

use anyhow::{Context, Result};
use std::io::Read;

use crate::Library;
use crate::cli::output::{DocumentSummary, Output, OutputFormat};
use crate::cli::{NewArgs, ShowArgs, WriteArgs};
use crate::domain::Document;

fn summary(doc: &Document) -> DocumentSummary {
    DocumentSummary {
        id: doc.id(),
        title: doc.title().to_string(),
        mode: doc.storage_mode(),
        path: doc.file_path().map(|p| p.to_string_lossy().into_owned()),
    }
}

pub fn handle_new(args: &NewArgs, library: &Library) -> Result<()> {
    let folder = match &args.folder {
        Some(path) => Some(
            library
                .create_folder(path)
                .with_context(|| format!("invalid folder: {}", path))?
                .id(),
        ),
        None => None,
    };

    let doc = library
        .create_document(&args.title, folder, args.mode)
        .context("failed to create document")?;

    // Gives the new document its file and index record straight away.
    let report = library.perform_quick_sync().context("sync after create failed")?;
    super::print_item_errors(&report.errors);
    let doc = library.get_document(&doc.id())?;

    match args.format {
        OutputFormat::Human => {
            println!("Created: {}", doc);
            if let Some(path) = doc.file_path() {
                println!("  {}", library.get_notes_directory().join(path).display());
            }
        }
        OutputFormat::Json => Output::new(summary(&doc)).print()?,
    }
    Ok(())
}

pub fn handle_write(args: &WriteArgs, library: &Library) -> Result<()> {
    let doc = library.find_document(&args.document)?;

    let text = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            text
        }
    };

    let doc = library
        .write_content(&doc.id(), &text)
        .with_context(|| format!("failed to save {}", doc))?;
    let report = library.perform_quick_sync().context("sync after write failed")?;
    super::print_item_errors(&report.errors);

    println!("Saved: {} ({} words)", doc, doc.word_count());
    Ok(())
}

pub fn handle_show(args: &ShowArgs, library: &Library) -> Result<()> {
    let doc = library.find_document(&args.document)?;
    let read = library
        .read_content(&doc.id())
        .with_context(|| format!("failed to read {}", doc))?;

    match args.format {
        OutputFormat::Human => {
            if read.drift {
                eprintln!(
                    "warning: {} differs between repository and file; showing the file",
                    doc
                );
            }
            print!("{}", read.text);
            if !read.text.is_empty() && !read.text.ends_with('\n') {
                println!();
            }
        }
        OutputFormat::Json => {
            Output::new(serde_json::json!({
                "document": summary(&doc),
                "words": doc.word_count(),
                "trashed": doc.is_trashed(),
                "source": read.source,
                "drift": read.drift,
                "content": read.text,
            }))
            .print()?;
        }
    }
    Ok(())
}
