//! CLI command definitions and handlers

pub mod config;
pub mod handlers;
pub mod output;

use clap::{ArgAction, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::domain::StorageMode;
use output::OutputFormat;

/// quire - a document library kept in sync across repository, files and index
#[derive(Parser, Debug)]
#[command(name = "quire", version, about, long_about = None)]
pub struct Cli {
    /// Library directory (overrides config file)
    #[arg(short = 'd', long, global = true)]
    pub dir: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reconcile repository, files and index
    Sync(SyncArgs),

    /// Create a new document
    New(NewArgs),

    /// Replace a document's content from a file or stdin
    Write(WriteArgs),

    /// Show a document's content
    Show(ShowArgs),

    /// List documents, optionally in one folder
    #[command(name = "ls")]
    List(ListArgs),

    /// List every folder path
    Folders(FormatArgs),

    /// List every document file on disk
    Files(FormatArgs),

    /// Search titles and tags
    Search(SearchArgs),

    /// Create a folder path
    Mkdir(MkdirArgs),

    /// Rename a folder and move every file below it
    RenameFolder(RenameFolderArgs),

    /// Move a folder under another one
    MoveFolder(MoveFolderArgs),

    /// Move a document to the trash
    Trash(DocumentArgs),

    /// Restore a document from the trash
    Restore(DocumentArgs),

    /// Permanently delete a trashed document
    Purge(PurgeArgs),

    /// Permanently delete everything in the trash
    EmptyTrash(EmptyTrashArgs),

    /// Check consistency between repository, files and index
    Health(HealthArgs),

    /// Show storage statistics
    Stats(FormatArgs),

    /// Check that every recorded file exists
    Verify(FormatArgs),

    /// Move every document file to its canonical path
    Migrate(FormatArgs),

    /// Rebuild the index
    Index(IndexArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments shared by commands whose only option is the output format
#[derive(Parser, Debug)]
pub struct FormatArgs {
    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// Arguments for the `sync` command
#[derive(Parser, Debug)]
pub struct SyncArgs {
    /// Examine every document instead of only those changed since the last sync
    #[arg(long)]
    pub full: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// Arguments for the `new` command
#[derive(Parser, Debug)]
pub struct NewArgs {
    /// Document title
    pub title: String,

    /// Folder path, created if missing (e.g. "Book/Part One")
    #[arg(short = 'F', long)]
    pub folder: Option<String>,

    /// Where the content is kept
    #[arg(short, long, default_value = "repository")]
    pub mode: StorageMode,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// Arguments for the `write` command
#[derive(Parser, Debug)]
pub struct WriteArgs {
    /// Document ID or unique prefix
    pub document: String,

    /// Read content from this file instead of stdin
    #[arg(long)]
    pub file: Option<PathBuf>,
}

/// Arguments for the `show` command
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Document ID or unique prefix
    pub document: String,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// Arguments for the `ls` (list) command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Folder path; lists only documents directly inside it
    pub folder: Option<String>,

    /// List trashed documents instead
    #[arg(short, long)]
    pub trash: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// Arguments for the `search` command
#[derive(Parser, Debug)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// Arguments for the `mkdir` command
#[derive(Parser, Debug)]
pub struct MkdirArgs {
    /// Folder path, `/`-separated
    pub path: String,
}

/// Arguments for the `rename-folder` command
#[derive(Parser, Debug)]
pub struct RenameFolderArgs {
    /// Current folder path
    pub path: String,

    /// New name
    pub name: String,
}

/// Arguments for the `move-folder` command
#[derive(Parser, Debug)]
pub struct MoveFolderArgs {
    /// Folder path to move
    pub path: String,

    /// New parent folder path (root level if omitted)
    #[arg(long)]
    pub to: Option<String>,
}

/// Arguments for commands that act on one document
#[derive(Parser, Debug)]
pub struct DocumentArgs {
    /// Document ID or unique prefix
    pub document: String,
}

/// Arguments for the `purge` command
#[derive(Parser, Debug)]
pub struct PurgeArgs {
    /// Document ID or unique prefix
    pub document: String,

    /// Confirm permanent deletion
    #[arg(long)]
    pub yes: bool,
}

/// Arguments for the `empty-trash` command
#[derive(Parser, Debug)]
pub struct EmptyTrashArgs {
    /// Confirm permanent deletion
    #[arg(long)]
    pub yes: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// Arguments for the `health` command
#[derive(Parser, Debug)]
pub struct HealthArgs {
    /// Run every check instead of the critical ones only
    #[arg(long)]
    pub full: bool,

    /// Apply safe fixes (implies --full)
    #[arg(long)]
    pub fix: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// Arguments for the `index` command
#[derive(Parser, Debug)]
pub struct IndexArgs {
    /// Rebuild from the file tree alone, without the repository
    #[arg(long)]
    pub from_files: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

/// Arguments for the `completions` command
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for (bash, zsh, fish)
    #[arg(value_enum)]
    pub shell: Shell,
}
