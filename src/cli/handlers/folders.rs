//! Folder command handlers.

use anyhow::{Context, Result};

use crate::Library;
use crate::cli::{MkdirArgs, MoveFolderArgs, RenameFolderArgs};

pub fn handle_mkdir(args: &MkdirArgs, library: &Library) -> Result<()> {
    let folder = library
        .create_folder(&args.path)
        .with_context(|| format!("failed to create folder: {}", args.path))?;
    println!("Created folder: {} [{}]", args.path.trim_matches('/'), folder.id().prefix());
    Ok(())
}

pub fn handle_rename_folder(args: &RenameFolderArgs, library: &Library) -> Result<()> {
    let folder = library.find_folder(&args.path)?;
    let moved = library
        .rename_folder(&folder.id(), &args.name)
        .with_context(|| format!("failed to rename folder: {}", args.path))?;
    println!(
        "Renamed: {} -> {} ({} document(s) moved)",
        folder.name(),
        args.name.trim(),
        moved.len()
    );
    Ok(())
}

pub fn handle_move_folder(args: &MoveFolderArgs, library: &Library) -> Result<()> {
    let folder = library.find_folder(&args.path)?;
    let parent = match &args.to {
        Some(path) => Some(library.find_folder(path)?.id()),
        None => None,
    };
    let moved = library
        .move_folder(&folder.id(), parent)
        .with_context(|| format!("failed to move folder: {}", args.path))?;
    println!(
        "Moved: {} -> {} ({} document(s) moved)",
        folder.name(),
        args.to.as_deref().unwrap_or("(root)"),
        moved.len()
    );
    Ok(())
}
