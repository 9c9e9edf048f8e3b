use super::{load_settings_from, normalize_database_url, DEFAULT_DATABASE_URL};

use std::fs;

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(
        normalize_database_url("sqlite:data\\test.db"),
        "sqlite://data/test.db"
    );
}

#[test]
fn keeps_memory_and_full_urls() {
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(
        normalize_database_url("sqlite:///var/lib/election.db"),
        "sqlite:///var/lib/election.db"
    );
    assert_eq!(normalize_database_url("   "), DEFAULT_DATABASE_URL);
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let stem = dir.path().join("absent");
    let settings = load_settings_from(stem.to_string_lossy().as_ref()).expect("settings");
    assert_eq!(settings.bind_addr, "127.0.0.1:8443");
    assert_eq!(settings.token_ttl_seconds, 3600);
    assert_eq!(settings.event_buffer, 256);
}

#[test]
fn file_values_override_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("server.toml");
    fs::write(
        &path,
        "administrator = \"clerk\"\ndatabase_url = \"sqlite::memory:\"\nevent_buffer = 8\n",
    )
    .expect("write");

    let stem = dir.path().join("server");
    let settings = load_settings_from(stem.to_string_lossy().as_ref()).expect("settings");
    assert_eq!(settings.administrator, "clerk");
    assert_eq!(settings.database_url, "sqlite::memory:");
    assert_eq!(settings.event_buffer, 8);
    assert_eq!(settings.auth_secret, "devsecret");
}

#[test]
fn blank_administrator_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("server.toml"), "administrator = \" \"\n").expect("write");
    let stem = dir.path().join("server");
    assert!(load_settings_from(stem.to_string_lossy().as_ref()).is_err());
}
