#![allow(clippy::unwrap_used)]
// File-backed loading and saving of `Config`.

use std::time::Duration;

use pretty_assertions::assert_eq;

use mvikit_config::{Config, ConfigError, load_config_from, save_config_to};

// ── Loading ─────────────────────────────────────────────────────────

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(cfg, Config::default());
}

#[test]
fn file_values_override_defaults_section_by_section() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[channels]
event_capacity = 8

[notifications]
short_ms = 1500

[demo]
fail_fetch = true
"#,
    )
    .unwrap();

    let cfg = load_config_from(&path).unwrap();
    assert_eq!(cfg.channels.event_capacity, 8);
    assert_eq!(cfg.channels.navigation_capacity, 16);
    assert!(cfg.demo.fail_fetch);
    assert_eq!(cfg.demo.username, "octocat");

    let runtime = cfg.to_runtime_config();
    assert_eq!(runtime.short_notification, Duration::from_millis(1_500));
    assert_eq!(runtime.long_notification, Duration::from_secs(10));
}

#[test]
fn invalid_file_values_fail_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[channels]\nnavigation_capacity = 0\n").unwrap();

    let err = load_config_from(&path).unwrap_err();
    assert!(
        matches!(err, ConfigError::Validation { ref field, .. } if field == "channels.navigation_capacity"),
        "unexpected error: {err}"
    );
}

#[test]
fn malformed_toml_is_a_figment_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[channels\nevent_capacity = ").unwrap();

    assert!(matches!(
        load_config_from(&path),
        Err(ConfigError::Figment(_))
    ));
}

// ── Saving ──────────────────────────────────────────────────────────

#[test]
fn saved_config_loads_back_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut cfg = Config::default();
    cfg.errors.title = "Oops".into();
    cfg.demo.latency_ms = 5;
    save_config_to(&cfg, &path).unwrap();

    assert_eq!(load_config_from(&path).unwrap(), cfg);
}

#[test]
fn invalid_config_is_never_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let mut cfg = Config::default();
    cfg.notifications.long_ms = 0;
    assert!(save_config_to(&cfg, &path).is_err());
    assert!(!path.exists());
}
