use super::*;

#[test]
fn defaults_leave_store_unconfigured_with_fallback_pin() {
    let settings = Settings::default();
    assert!(settings.store_url.is_empty());
    assert!(settings.store_api_key.is_empty());
    assert_eq!(settings.admin_pin, DEFAULT_ADMIN_PIN);
    assert!(!settings.admin_pin_overridden());
}

#[test]
fn overridden_pin_is_detected() {
    let settings = Settings {
        admin_pin: "secret".into(),
        ..Settings::default()
    };
    assert!(settings.admin_pin_overridden());
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
}

#[test]
fn normalizes_sqlite_prefix_without_slashes() {
    assert_eq!(
        normalize_database_url("sqlite:data/test.db"),
        "sqlite://data/test.db"
    );
}

#[test]
fn empty_database_url_falls_back_to_default() {
    assert_eq!(
        normalize_database_url("   "),
        Settings::default().database_url
    );
}

#[test]
fn memory_url_passes_through_untouched() {
    assert_eq!(
        normalize_database_url("sqlite::memory:"),
        "sqlite::memory:"
    );
}

#[test]
fn creates_parent_dir_for_sqlite_url() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("booth_config_test_{suffix}"));
    let db_path = temp_root.join("data").join("booth.db");
    let raw = db_path.to_string_lossy().replace('\\', "/");

    prepare_database_url(&raw).expect("prepare db url");
    assert!(temp_root.join("data").exists());

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}
