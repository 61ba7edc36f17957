//! Tests for TOML configuration file resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate HERMON_CONFIG are marked with #[serial].

use hermon_common::config::{TomlConfig, CONFIG_ENV_VAR};
use serial_test::serial;
use std::env;
use std::io::Write;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_explicit_path_wins_over_env() {
    let cli_file = write_config("[server]\nport = 4000\n");
    let env_file = write_config("[server]\nport = 5000\n");
    env::set_var(CONFIG_ENV_VAR, env_file.path());

    let config = TomlConfig::load(Some(cli_file.path())).unwrap();
    assert_eq!(config.server.port, Some(4000));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_path_used_without_cli() {
    let env_file = write_config("[logging]\nlevel = \"warn\"\n");
    env::set_var(CONFIG_ENV_VAR, env_file.path());

    let config = TomlConfig::load(None).unwrap();
    assert_eq!(config.logging.level, "warn");

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_explicit_file_is_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    assert!(TomlConfig::load(Some(&missing)).is_err());
}

#[test]
#[serial]
fn test_invalid_file_is_error() {
    let file = write_config("port = [");
    assert!(TomlConfig::load(Some(file.path())).is_err());
}
