//! Configuration loading, precedence and runtime layout tests

use hostbridge_config::{
    ConfigError, ConfigLoader, RuntimeIdentifier, RuntimeLayout, SizePolicy,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn create_config_file(dir: &Path, content: &str) -> std::path::PathBuf {
    let config_path = dir.join("hostbridge.toml");
    fs::write(&config_path, content).unwrap();
    config_path
}

fn clear_env() {
    for var in [
        "HOSTBRIDGE_RUNTIMES_DIR",
        "HOSTBRIDGE_RID",
        "HOSTBRIDGE_SIZE_POLICY",
        "HOSTBRIDGE_LOG",
    ] {
        env::remove_var(var);
    }
}

// ============================================================================
// Config Loading Tests
// ============================================================================

#[test]
#[serial]
fn test_load_project_config_basic() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    create_config_file(
        temp_dir.path(),
        r#"
[transfer]
size_policy = "exact"
text = "Grüße"
"#,
    );

    let mut loader = ConfigLoader::without_user_config();
    let config = loader.load_from_directory(temp_dir.path()).unwrap();

    assert!(config.is_project());
    assert_eq!(config.size_policy(), SizePolicy::Exact);
    assert_eq!(config.text(), Some("Grüße"));
}

#[test]
#[serial]
fn test_load_when_no_config_exists() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    let mut loader = ConfigLoader::without_user_config();
    let config = loader.load_from_directory(temp_dir.path()).unwrap();

    assert!(!config.is_project());
    assert_eq!(config.size_policy(), SizePolicy::WorstCase);
    assert_eq!(config.text(), None);
}

#[test]
#[serial]
fn test_load_from_subdirectory_finds_parent() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    create_config_file(
        temp_dir.path(),
        r#"
[logging]
filter = "hostbridge_runtime=trace"
"#,
    );

    let nested = temp_dir.path().join("a").join("b");
    fs::create_dir_all(&nested).unwrap();

    let mut loader = ConfigLoader::without_user_config();
    let config = loader.load_from_directory(&nested).unwrap();

    assert_eq!(config.project_root(), Some(temp_dir.path()));
    assert_eq!(config.log_filter(), Some("hostbridge_runtime=trace"));
}

#[test]
#[serial]
fn test_load_from_specific_file() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(
        temp_dir.path(),
        r#"
[runtimes]
rid = "osx-arm64"
"#,
    );

    let mut loader = ConfigLoader::without_user_config();
    let config = loader.load_from_file(&path).unwrap();

    assert_eq!(config.runtime_identifier().unwrap().as_str(), "osx-arm64");
}

#[test]
fn test_invalid_toml_syntax() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), "[transfer\nsize_policy = ");

    let mut loader = ConfigLoader::without_user_config();
    let result = loader.load_from_file(&path);

    assert!(matches!(result, Err(ConfigError::TomlParseError { .. })));
}

#[test]
fn test_invalid_rid_in_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(
        temp_dir.path(),
        r#"
[runtimes]
rid = "linux"
"#,
    );

    let mut loader = ConfigLoader::without_user_config();
    let result = loader.load_from_file(&path);

    assert!(matches!(
        result,
        Err(ConfigError::InvalidRuntimeIdentifier(_))
    ));
}

#[test]
fn test_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let mut loader = ConfigLoader::without_user_config();
    let result = loader.load_from_file(&temp_dir.path().join("hostbridge.toml"));

    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

// ============================================================================
// Environment Override Tests
// ============================================================================

#[test]
#[serial]
fn test_env_overrides_file_values() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    create_config_file(
        temp_dir.path(),
        r#"
[runtimes]
dir = "from-file"
rid = "linux-x64"

[transfer]
size_policy = "worst-case"
"#,
    );

    env::set_var("HOSTBRIDGE_RUNTIMES_DIR", "/srv/runtimes");
    env::set_var("HOSTBRIDGE_RID", "win-x64");
    env::set_var("HOSTBRIDGE_SIZE_POLICY", "exact");
    env::set_var("HOSTBRIDGE_LOG", "debug");

    let mut loader = ConfigLoader::without_user_config();
    let config = loader.load_from_directory(temp_dir.path()).unwrap();
    clear_env();

    assert_eq!(config.runtime_layout().root(), Path::new("/srv/runtimes"));
    assert_eq!(config.runtime_identifier().unwrap().as_str(), "win-x64");
    assert_eq!(config.size_policy(), SizePolicy::Exact);
    assert_eq!(config.log_filter(), Some("debug"));
}

#[test]
#[serial]
fn test_env_invalid_size_policy() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    env::set_var("HOSTBRIDGE_SIZE_POLICY", "generous");

    let mut loader = ConfigLoader::without_user_config();
    let result = loader.load_from_directory(temp_dir.path());
    clear_env();

    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

// ============================================================================
// Runtime Layout Tests
// ============================================================================

#[test]
#[serial]
fn test_relative_runtimes_dir_resolves_against_project_root() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    create_config_file(
        temp_dir.path(),
        r#"
[runtimes]
dir = "vendor/runtimes"
"#,
    );

    let mut loader = ConfigLoader::without_user_config();
    let config = loader.load_from_directory(temp_dir.path()).unwrap();

    assert_eq!(
        config.runtime_layout().root(),
        temp_dir.path().join("vendor").join("runtimes")
    );
}

#[test]
fn test_installed_lists_platform_directories() {
    let temp_dir = TempDir::new().unwrap();
    for rid in ["win-x64", "linux-x64", "osx-arm64"] {
        fs::create_dir_all(temp_dir.path().join(rid)).unwrap();
    }
    // Not a runtime identifier
    fs::create_dir_all(temp_dir.path().join("scratch")).unwrap();
    fs::write(temp_dir.path().join("README"), "provisioned").unwrap();

    let layout = RuntimeLayout::new(temp_dir.path());
    let installed: Vec<String> = layout
        .installed()
        .unwrap()
        .into_iter()
        .map(|rid| rid.to_string())
        .collect();

    assert_eq!(installed, vec!["linux-x64", "osx-arm64", "win-x64"]);
}

#[rstest]
#[case("runtime.linux-x64.Microsoft.NETCore.DotNetAppHost", Some("linux-x64"))]
#[case("runtime.win-arm64.Microsoft.NETCore.DotNetAppHost", Some("win-arm64"))]
#[case("runtime.linux-musl-x64.Microsoft.NETCore.DotNetAppHost", Some("linux-musl-x64"))]
#[case("Microsoft.NETCore.DotNetAppHost", None)]
#[case("runtime.Microsoft", None)]
fn test_rid_from_package_title(#[case] title: &str, #[case] expected: Option<&str>) {
    let rid = RuntimeIdentifier::from_package_title(title);
    assert_eq!(rid.as_ref().map(RuntimeIdentifier::as_str), expected);
}
