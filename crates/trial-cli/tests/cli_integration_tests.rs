//! End-to-end tests of the `trial` binary
//!
//! Covers help and version output, exit codes, the error line format and
//! the configuration hierarchy as seen from the command line.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

/// `trial` running inside `dir`, isolated from the user's environment
fn trial_in(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("trial").unwrap();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("NO_COLOR", "1")
        .env_remove("TRIAL_LOG");
    for var in [
        "TRIAL_SPEC", "TRIAL_EXTENSION", "TRIAL_IGNORE", "TRIAL_REQUIRE", "TRIAL_RECURSIVE",
        "TRIAL_SORT", "TRIAL_BAIL", "TRIAL_REPORTER", "TRIAL_TIMEOUT", "TRIAL_SLOW", "TRIAL_GREP",
        "TRIAL_JOBS",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("test/nested")).unwrap();
    fs::write(temp.path().join("test/one.spec"), "").unwrap();
    fs::write(temp.path().join("test/nested/two.spec"), "").unwrap();
    temp
}

// ══════════════════════════════════════════════════════════════════════════════
// HELP AND VERSION
// ══════════════════════════════════════════════════════════════════════════════

mod help_messages {
    use super::*;

    #[test]
    fn test_main_help_lists_commands_and_sections() {
        let temp = TempDir::new().unwrap();
        trial_in(&temp)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Usage: trial"))
            .stdout(predicate::str::contains("run"))
            .stdout(predicate::str::contains("init"))
            .stdout(predicate::str::contains("Runner Options:"))
            .stdout(predicate::str::contains("--reporter"))
            .stdout(predicate::str::contains("ENVIRONMENT VARIABLES"))
            .stderr(predicate::str::is_empty());
    }

    #[test]
    fn test_init_help() {
        let temp = TempDir::new().unwrap();
        trial_in(&temp)
            .args(["init", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Positional Arguments:"))
            .stdout(predicate::str::contains("<path>"))
            .stdout(predicate::str::contains("--force"));
    }

    #[test]
    fn test_version() {
        let temp = TempDir::new().unwrap();
        trial_in(&temp)
            .arg("--version")
            .assert()
            .success()
            .stdout(format!("trial {}\n", env!("CARGO_PKG_VERSION")));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// ERROR HANDLING
// ══════════════════════════════════════════════════════════════════════════════

mod error_handling {
    use super::*;

    #[test]
    fn test_unknown_flag_exits_with_usage_code() {
        let temp = project();
        trial_in(&temp)
            .arg("--frobnicate")
            .assert()
            .code(2)
            .stdout(predicate::str::contains("Usage: trial"))
            .stderr(predicate::str::contains("ERROR:"))
            .stderr(predicate::str::contains("--frobnicate"));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_argument_is_a_usage_error() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = project();
        trial_in(&temp)
            .arg("--no-config")
            .arg(OsStr::from_bytes(b"\xff"))
            .assert()
            .code(2)
            .stderr(predicate::str::contains("ERROR:"))
            .stderr(predicate::str::contains("invalid UTF-8"))
            .stderr(predicate::str::contains("panicked").not());
    }

    #[test]
    fn test_missing_init_path() {
        let temp = TempDir::new().unwrap();
        trial_in(&temp)
            .arg("init")
            .assert()
            .code(2)
            .stdout(predicate::str::contains("<path>"))
            .stderr(predicate::str::contains("ERROR:"));
    }

    #[test]
    fn test_invalid_timeout() {
        let temp = project();
        trial_in(&temp)
            .args(["--timeout", "soon"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("soon"));
    }

    #[test]
    fn test_no_test_files_is_a_command_failure() {
        let temp = TempDir::new().unwrap();
        trial_in(&temp)
            .assert()
            .code(1)
            .stderr(predicate::str::contains("No test files found"))
            .stderr(predicate::str::contains("ERROR:").not());
    }

    #[test]
    fn test_broken_config_file() {
        let temp = project();
        fs::write(temp.path().join("trial.toml"), "timeout = \n").unwrap();
        trial_in(&temp)
            .assert()
            .code(1)
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains("ERROR:"))
            .stderr(predicate::str::contains("trial.toml"));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// COMMANDS
// ══════════════════════════════════════════════════════════════════════════════

mod commands {
    use super::*;

    #[test]
    fn test_init_then_run() {
        let temp = TempDir::new().unwrap();
        trial_in(&temp)
            .args(["init", "demo"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Initialized trial project"));

        assert!(temp.path().join("demo/trial.toml").exists());
        assert!(temp.path().join("demo/test/example.spec").exists());

        let mut cmd = Command::cargo_bin("trial").unwrap();
        cmd.current_dir(temp.path().join("demo"))
            .env("HOME", temp.path())
            .env_remove("TRIAL_SPEC")
            .assert()
            .success()
            .stdout(predicate::str::contains("test/example.spec"));
    }

    #[test]
    fn test_init_refuses_existing_project() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("trial.toml"), "").unwrap();

        trial_in(&temp)
            .args(["init", "."])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("already initialized"));

        trial_in(&temp).args(["init", ".", "--force"]).assert().success();
    }

    #[test]
    fn test_run_recursive_flag() {
        let temp = project();
        trial_in(&temp)
            .assert()
            .success()
            .stdout(predicate::str::contains("Found 1 test file"));

        trial_in(&temp)
            .args(["run", "--recursive"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Found 2 test files"))
            .stdout(predicate::str::contains("two.spec"));
    }

    #[test]
    fn test_config_hierarchy() {
        let temp = project();
        fs::create_dir_all(temp.path().join(".trial")).unwrap();
        fs::write(
            temp.path().join(".trial/config.toml"),
            "[defaults]\nreporter = \"tap\"\nslow = 100\n",
        )
        .unwrap();
        fs::write(temp.path().join("trial.toml"), "reporter = \"dot\"\n").unwrap();

        // Project file beats user defaults, which still fill the gaps
        trial_in(&temp)
            .assert()
            .success()
            .stdout(predicate::str::contains("Reporter: dot"))
            .stdout(predicate::str::contains("slow 100ms"));

        // Environment beats the project file
        trial_in(&temp)
            .env("TRIAL_REPORTER", "json")
            .assert()
            .success()
            .stdout(predicate::str::contains("Reporter: json"));

        // Flags beat everything
        trial_in(&temp)
            .env("TRIAL_REPORTER", "json")
            .args(["-R", "spec"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Reporter: spec"));
    }
}
