//! quire - a document library kept consistent across a structured
//! repository, a tree of Markdown files and a searchable index

pub mod cli;
pub mod db;
pub mod domain;
pub mod error;
pub mod index;
pub mod infra;
pub mod library;
pub mod maintenance;
pub mod progress;
pub mod repository;
pub mod sync;

pub use error::{Error, ErrorKind, ItemError, Result};
pub use library::{Confirmation, EmptyTrashReport, Library, LibraryOptions, PassStatus};

use anyhow::Context;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cli::{
    Cli, Command,
    config::Config,
    handlers::{
        handle_empty_trash, handle_files, handle_folders, handle_health, handle_index,
        handle_list, handle_migrate, handle_mkdir, handle_move_folder, handle_new, handle_purge,
        handle_rename_folder, handle_restore, handle_search, handle_show, handle_stats,
        handle_sync, handle_trash, handle_verify, handle_write,
    },
};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "QUIRE_LOG";

/// Installs the stderr log subscriber. `-v` and `-vv` override `QUIRE_LOG`.
fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    // A subscriber may already be installed when running under a test harness.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Main entry point for the CLI application.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Command::Completions(args) = &cli.command {
        clap_complete::generate(args.shell, &mut Cli::command(), "quire", &mut std::io::stdout());
        return Ok(());
    }

    let config = Config::load()?;
    let options = config.library_options(cli.dir.as_ref());
    let library = Library::open(options).context("failed to open library")?;
    let verbose = cli.verbose > 0;

    match &cli.command {
        Command::Sync(args) => handle_sync(args, &library, verbose),
        Command::New(args) => handle_new(args, &library),
        Command::Write(args) => handle_write(args, &library),
        Command::Show(args) => handle_show(args, &library),
        Command::List(args) => handle_list(args, &library),
        Command::Folders(args) => handle_folders(args, &library),
        Command::Files(args) => handle_files(args, &library),
        Command::Search(args) => handle_search(args, &library),
        Command::Mkdir(args) => handle_mkdir(args, &library),
        Command::RenameFolder(args) => handle_rename_folder(args, &library),
        Command::MoveFolder(args) => handle_move_folder(args, &library),
        Command::Trash(args) => handle_trash(args, &library),
        Command::Restore(args) => handle_restore(args, &library),
        Command::Purge(args) => handle_purge(args, &library),
        Command::EmptyTrash(args) => handle_empty_trash(args, &library),
        Command::Health(args) => handle_health(args, &library),
        Command::Stats(args) => handle_stats(args, &library),
        Command::Verify(args) => handle_verify(args, &library),
        Command::Migrate(args) => handle_migrate(args, &library),
        Command::Index(args) => handle_index(args, &library, verbose),
        Command::Completions(_) => Ok(()),
    }
}
