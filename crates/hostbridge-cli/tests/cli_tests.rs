//! CLI integration tests
//!
//! Tests the complete CLI experience including:
//! - Help messages and examples
//! - Each strategy through the demo command
//! - Parameter passing commands and their exit status
//! - Configuration files and environment overrides

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

/// Binary run from an empty directory so no stray hostbridge.toml is picked up
fn hostbridge_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("hostbridge").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("HOSTBRIDGE_LOG")
        .env_remove("HOSTBRIDGE_SIZE_POLICY")
        .env_remove("HOSTBRIDGE_RUNTIMES_DIR")
        .env_remove("HOSTBRIDGE_RID");
    cmd
}

// ══════════════════════════════════════════════════════════════════════════════
// HELP MESSAGE TESTS
// ══════════════════════════════════════════════════════════════════════════════

mod help_messages {
    use super::*;

    #[test]
    fn test_main_help_shows_all_commands() {
        let dir = TempDir::new().unwrap();
        hostbridge_cmd(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("demo"))
            .stdout(predicate::str::contains("palindrome"))
            .stdout(predicate::str::contains("length"))
            .stdout(predicate::str::contains("exports"))
            .stdout(predicate::str::contains("runtimes"));
    }

    #[test]
    fn test_main_help_shows_environment_variables() {
        let dir = TempDir::new().unwrap();
        hostbridge_cmd(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("ENVIRONMENT VARIABLES"))
            .stdout(predicate::str::contains("HOSTBRIDGE_LOG"))
            .stdout(predicate::str::contains("HOSTBRIDGE_SIZE_POLICY"));
    }

    #[test]
    fn test_demo_help_lists_strategies() {
        let dir = TempDir::new().unwrap();
        hostbridge_cmd(&dir)
            .args(["demo", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("STRATEGIES"))
            .stdout(predicate::str::contains("--strategy"))
            .stdout(predicate::str::contains("EXAMPLES"));
    }

    #[test]
    fn test_completions_generated() {
        let dir = TempDir::new().unwrap();
        hostbridge_cmd(&dir)
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("hostbridge"));
    }

    #[test]
    fn test_version_flag() {
        let dir = TempDir::new().unwrap();
        hostbridge_cmd(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("hostbridge"));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// DEMO COMMAND TESTS
// ══════════════════════════════════════════════════════════════════════════════

mod demo {
    use super::*;

    #[test]
    fn test_demo_all_strategies_return_default_text() {
        let dir = TempDir::new().unwrap();
        let expected = "Some string we want to return to the native host.";
        hostbridge_cmd(&dir)
            .arg("demo")
            .assert()
            .success()
            .stdout(predicate::str::contains(format!("copy       {}", expected)))
            .stdout(predicate::str::contains(format!("heap       {}", expected)))
            .stdout(predicate::str::contains(format!("pinned     {}", expected)))
            .stdout(predicate::str::contains(format!("allocator  {}", expected)));
    }

    #[test]
    fn test_demo_custom_text() {
        let dir = TempDir::new().unwrap();
        hostbridge_cmd(&dir)
            .args(["demo", "--strategy", "heap", "--text", "Grüße"])
            .assert()
            .success()
            .stdout(predicate::str::contains("heap       Grüße"))
            .stdout(predicate::str::contains("copy").not());
    }

    #[test]
    fn test_demo_verbose_shows_owner() {
        let dir = TempDir::new().unwrap();
        hostbridge_cmd(&dir)
            .args(["demo", "-s", "pinned", "-v"])
            .assert()
            .success()
            .stdout(predicate::str::contains("abi 1"))
            .stdout(predicate::str::contains("[shared-pinned]"));
    }

    #[test]
    fn test_demo_unknown_strategy_rejected() {
        let dir = TempDir::new().unwrap();
        hostbridge_cmd(&dir)
            .args(["demo", "--strategy", "mmap"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid value"));
    }

    #[test]
    fn test_demo_reads_project_config() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("hostbridge.toml"),
            "[transfer]\ntext = \"from config\"\nsize_policy = \"exact\"\n",
        )
        .unwrap();

        hostbridge_cmd(&dir)
            .args(["demo", "-v"])
            .assert()
            .success()
            .stdout(predicate::str::contains("size policy exact"))
            .stdout(predicate::str::contains("allocator  [caller]        from config"));
    }

    #[test]
    fn test_demo_size_policy_from_env() {
        let dir = TempDir::new().unwrap();
        hostbridge_cmd(&dir)
            .args(["demo", "-v", "-s", "allocator"])
            .env("HOSTBRIDGE_SIZE_POLICY", "exact")
            .assert()
            .success()
            .stdout(predicate::str::contains("size policy exact"));
    }

    #[test]
    fn test_invalid_config_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("hostbridge.toml"), "[transfer\n").unwrap();

        hostbridge_cmd(&dir)
            .arg("demo")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to load configuration"));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// PARAMETER PASSING TESTS
// ══════════════════════════════════════════════════════════════════════════════

mod parameters {
    use super::*;

    #[test]
    fn test_palindrome_success() {
        let dir = TempDir::new().unwrap();
        hostbridge_cmd(&dir)
            .args(["palindrome", "Step", "on", "no", "pets"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"Step on no pets\" is a palindrome"));
    }

    #[test]
    fn test_palindrome_failure_exit_status() {
        let dir = TempDir::new().unwrap();
        hostbridge_cmd(&dir)
            .args(["palindrome", "hello"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("is not a palindrome"));
    }

    #[test]
    fn test_palindrome_requires_words() {
        let dir = TempDir::new().unwrap();
        hostbridge_cmd(&dir).arg("palindrome").assert().failure();
    }

    #[test]
    fn test_length() {
        let dir = TempDir::new().unwrap();
        hostbridge_cmd(&dir)
            .args(["length", "3", "4"])
            .assert()
            .success()
            .stdout(predicate::str::diff("5\n"));
    }

    #[test]
    fn test_length_negative_component() {
        let dir = TempDir::new().unwrap();
        hostbridge_cmd(&dir)
            .args(["length", "-5", "12"])
            .assert()
            .success()
            .stdout(predicate::str::diff("13\n"));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// EXPORT AND RUNTIME LISTING TESTS
// ══════════════════════════════════════════════════════════════════════════════

mod listings {
    use super::*;

    #[test]
    fn test_exports_lists_surface() {
        let dir = TempDir::new().unwrap();
        hostbridge_cmd(&dir)
            .arg("exports")
            .assert()
            .success()
            .stdout(predicate::str::contains("15 entries"))
            .stdout(predicate::str::contains("hostbridge_text_into_buffer"))
            .stdout(predicate::str::contains("hostbridge_native_increment"));
    }

    #[test]
    fn test_runtimes_lists_installed() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("runtimes");
        fs::create_dir_all(root.join("linux-x64")).unwrap();
        fs::create_dir_all(root.join("osx-arm64")).unwrap();
        fs::write(root.join("linux-x64").join("libnethost.so"), b"").unwrap();

        hostbridge_cmd(&dir)
            .args(["runtimes", "--dir"])
            .arg(&root)
            .env("HOSTBRIDGE_RID", "linux-x64")
            .assert()
            .success()
            .stdout(predicate::str::contains("Selected platform: linux-x64"))
            .stdout(predicate::str::contains("* linux-x64"))
            .stdout(predicate::str::contains("osx-arm64"));
    }

    #[test]
    fn test_runtimes_empty_tree() {
        let dir = TempDir::new().unwrap();
        hostbridge_cmd(&dir)
            .args(["runtimes"])
            .env("HOSTBRIDGE_RID", "linux-x64")
            .assert()
            .success()
            .stdout(predicate::str::contains("No runtimes provisioned"));
    }

    #[test]
    fn test_runtimes_load_missing_library() {
        let dir = TempDir::new().unwrap();
        hostbridge_cmd(&dir)
            .args(["runtimes", "--load"])
            .env("HOSTBRIDGE_RID", "linux-x64")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to load the host library"));
    }
}
