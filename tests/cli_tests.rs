//! End-to-end CLI test suite.
//!
//! Each test drives the `quire` binary against an isolated library.

mod common;

use common::harness::TestEnv;
use predicates::prelude::*;
use serde_json::Value;

/// Creates a document through the CLI and returns its identifier.
fn new_document(env: &TestEnv, args: &[&str]) -> String {
    let out: Value = env.cmd().args(["new"]).args(args).format_json().output_json();
    out["data"]["id"]
        .as_str()
        .expect("id should be a string")
        .to_string()
}

// ===========================================
// new / write / show
// ===========================================
mod document_tests {
    use super::*;

    #[test]
    fn new_creates_file_and_lists_it() {
        let env = TestEnv::new();
        let id = new_document(&env, &["Morning Pages"]);

        assert!(env.exists("Morning Pages.md"));
        env.cmd()
            .args(["ls"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Morning Pages"))
            .stdout(predicate::str::contains(&id[..8]));
    }

    #[test]
    fn new_in_folder_creates_directories() {
        let env = TestEnv::new();
        let out: Value = env
            .cmd()
            .args(["new", "Chapter One", "-F", "Book/Part One"])
            .format_json()
            .output_json();

        assert_eq!(out["data"]["path"], "Book/Part One/Chapter One.md");
        assert!(env.exists("Book/Part One/Chapter One.md"));
    }

    #[test]
    fn new_file_mode_reports_mode() {
        let env = TestEnv::new();
        let out: Value = env
            .cmd()
            .args(["new", "Loose", "--mode", "file"])
            .format_json()
            .output_json();
        assert_eq!(out["data"]["mode"], "file");
    }

    #[test]
    fn new_rejects_unknown_mode() {
        let env = TestEnv::new();
        env.cmd()
            .args(["new", "Bad", "--mode", "cloud"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown storage mode"));
    }

    #[test]
    fn write_from_stdin_then_show() {
        let env = TestEnv::new();
        let id = new_document(&env, &["Journal"]);

        env.cmd()
            .args(["write", &id[..10]])
            .stdin("Dear diary,\nit rained.\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("Saved: Journal"));

        env.cmd()
            .args(["show", &id])
            .assert()
            .success()
            .stdout("Dear diary,\nit rained.\n");
        assert!(env.read_file("Journal.md").ends_with("it rained.\n"));
    }

    #[test]
    fn show_json_names_the_source() {
        let env = TestEnv::new();
        let id = new_document(&env, &["Source"]);
        let out: Value = env.cmd().args(["show", &id]).format_json().output_json();
        assert_eq!(out["data"]["source"], "repository");
        assert_eq!(out["data"]["drift"], false);
    }

    #[test]
    fn show_unknown_document_fails() {
        let env = TestEnv::new();
        env.cmd()
            .args(["show", "01ZZZZZZZZ"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not found"));
    }
}

// ===========================================
// sync / index
// ===========================================
mod sync_tests {
    use super::*;

    #[test]
    fn full_sync_reports_orphans() {
        let env = TestEnv::new();
        env.write_foreign_document("Stray.md", "Stray", "body");

        let out: Value = env
            .cmd()
            .args(["sync", "--full"])
            .format_json()
            .output_json();
        assert_eq!(out["data"]["orphans"][0], "Stray.md");
        assert!(env.exists("Stray.md"));
    }

    #[test]
    fn sync_creates_data_dir() {
        let env = TestEnv::new();
        env.cmd().args(["sync"]).assert().success();
        assert!(env.exists(".quire/library.db"));
        assert!(env.exists(".quire/index.db"));
    }

    #[test]
    fn index_from_files_counts_documents() {
        let env = TestEnv::new();
        new_document(&env, &["One"]);
        new_document(&env, &["Two"]);

        let out: Value = env
            .cmd()
            .args(["index", "--from-files"])
            .format_json()
            .output_json();
        assert_eq!(out["data"]["indexed"], 2);
    }
}

// ===========================================
// folders
// ===========================================
mod folder_tests {
    use super::*;

    #[test]
    fn rename_folder_moves_files() {
        let env = TestEnv::new();
        new_document(&env, &["Draft", "-F", "Drafts"]);

        env.cmd()
            .args(["rename-folder", "Drafts", "Drafts2025"])
            .assert()
            .success();

        assert!(env.exists("Drafts2025/Draft.md"));
        assert!(!env.exists("Drafts/Draft.md"));
        env.cmd()
            .args(["folders"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Drafts2025"));
    }

    #[test]
    fn move_folder_under_itself_fails() {
        let env = TestEnv::new();
        env.cmd().args(["mkdir", "A/B"]).assert().success();

        env.cmd()
            .args(["move-folder", "A", "--to", "A/B"])
            .assert()
            .failure();
    }
}

// ===========================================
// trash / purge
// ===========================================
mod trash_tests {
    use super::*;

    #[test]
    fn trash_and_restore() {
        let env = TestEnv::new();
        let id = new_document(&env, &["Keeper"]);

        env.cmd().args(["trash", &id]).assert().success();
        assert!(!env.exists("Keeper.md"));
        env.cmd()
            .args(["ls", "--trash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Keeper"));

        env.cmd().args(["restore", &id]).assert().success();
        assert!(env.exists("Keeper.md"));
    }

    #[test]
    fn purge_without_yes_fails() {
        let env = TestEnv::new();
        let id = new_document(&env, &["Doomed"]);
        env.cmd().args(["trash", &id]).assert().success();

        env.cmd()
            .args(["purge", &id])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--yes"));

        env.cmd().args(["purge", &id, "--yes"]).assert().success();
        env.cmd()
            .args(["ls", "--trash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No documents found."));
    }

    #[test]
    fn empty_trash_takes_backup() {
        let env = TestEnv::new();
        let id = new_document(&env, &["Old"]);
        env.cmd().args(["trash", &id]).assert().success();

        let out: Value = env
            .cmd()
            .args(["empty-trash", "--yes"])
            .format_json()
            .output_json();
        assert_eq!(out["data"]["purged"], 1);
        assert!(out["data"]["backup"].is_string());
    }
}

// ===========================================
// health / stats / verify
// ===========================================
mod health_tests {
    use super::*;

    #[test]
    fn healthy_library_passes() {
        let env = TestEnv::new();
        new_document(&env, &["Fine"]);

        env.cmd()
            .args(["health", "--full"])
            .assert()
            .success()
            .stdout(predicate::str::contains("All documents OK."));
    }

    #[test]
    fn missing_file_fails_health() {
        let env = TestEnv::new();
        new_document(&env, &["Fragile", "--mode", "file"]);
        std::fs::remove_file(env.root().join("Fragile.md")).unwrap();

        env.cmd()
            .args(["health"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("critical"))
            .stderr(predicate::str::contains("critical issues"));
    }

    #[test]
    fn stats_json_counts_modes() {
        let env = TestEnv::new();
        new_document(&env, &["A"]);
        new_document(&env, &["B", "--mode", "file"]);

        let out: Value = env.cmd().args(["stats"]).format_json().output_json();
        assert!(out["data"].is_object());
    }
}

// ===========================================
// misc
// ===========================================
mod misc_tests {
    use super::*;

    #[test]
    fn help_lists_commands() {
        let env = TestEnv::new();
        env.cmd()
            .args(["--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("sync"))
            .stdout(predicate::str::contains("empty-trash"));
    }

    #[test]
    fn completions_bash() {
        let env = TestEnv::new();
        env.cmd()
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("quire"));
    }

    #[test]
    fn config_file_supplies_directory() {
        let env = TestEnv::new();
        let config_dir = env.root().parent().unwrap().join("config/quire");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.toml"),
            format!("dir = {:?}\n", env.root().display().to_string()),
        )
        .unwrap();

        common::harness::QuireCommand::new()
            .config_home(&env.root().parent().unwrap().join("config"))
            .args(["new", "Configured"])
            .assert()
            .success();
        assert!(env.exists("Configured.md"));
    }
}
