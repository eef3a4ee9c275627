//! Environment variable precedence tests

use formbind_config::{ConfigProvider, FormConfig};
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

struct EnvGuard {
    keys: Vec<&'static str>,
}

impl EnvGuard {
    fn set(pairs: &[(&'static str, &str)]) -> Self {
        for (key, value) in pairs {
            env::set_var(key, value);
        }
        Self {
            keys: pairs.iter().map(|(k, _)| *k).collect(),
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in &self.keys {
            env::remove_var(key);
        }
    }
}

#[test]
#[serial]
fn test_env_overrides_file() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("formbind.toml"), "validator_timeout_ms = 100\n").unwrap();
    let _guard = EnvGuard::set(&[("FORMBIND_VALIDATOR_TIMEOUT_MS", "250")]);

    let config = ConfigProvider::load_from(temp.path()).load().unwrap();
    assert_eq!(config.validator_timeout_ms, Some(250));
}

#[test]
#[serial]
fn test_env_boolean_and_string() {
    let temp = TempDir::new().unwrap();
    let _guard = EnvGuard::set(&[
        ("FORMBIND_DEFER_VALIDATION", "false"),
        ("FORMBIND_BIND_ATTRIBUTE", "data-pointer"),
    ]);

    let config = ConfigProvider::load_from(temp.path()).load().unwrap();
    assert!(!config.defer_validation);
    assert_eq!(config.bind_attribute, "data-pointer");
}

#[test]
#[serial]
fn test_env_invalid_capacity_rejected() {
    let temp = TempDir::new().unwrap();
    let _guard = EnvGuard::set(&[("FORMBIND_EVENT_CAPACITY", "0")]);

    let err = ConfigProvider::load_from(temp.path()).load().unwrap_err();
    assert!(err.to_string().contains("event_capacity"));
}

#[test]
#[serial]
fn test_unrelated_env_ignored() {
    let temp = TempDir::new().unwrap();
    let _guard = EnvGuard::set(&[("FORMBINDX_EVENT_CAPACITY", "3")]);

    let config = ConfigProvider::load_from(temp.path()).load().unwrap();
    assert_eq!(config, FormConfig::default());
}
