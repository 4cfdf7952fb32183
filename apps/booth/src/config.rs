use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;

/// Fallback admin secret used when no environment value is provided.
/// Insecure by design for booth-floor convenience; override ADMIN_PIN in
/// any real deployment.
pub const DEFAULT_ADMIN_PIN: &str = "6779";

#[derive(Debug, Clone)]
pub struct Settings {
    /// Remote store endpoint; empty means not configured.
    pub store_url: String,
    pub store_api_key: String,
    pub admin_pin: String,
    pub database_url: String,
    pub status_bind: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_url: String::new(),
            store_api_key: String::new(),
            admin_pin: DEFAULT_ADMIN_PIN.into(),
            database_url: "sqlite://./data/booth.db".into(),
            status_bind: "127.0.0.1:8088".into(),
        }
    }
}

impl Settings {
    pub fn admin_pin_overridden(&self) -> bool {
        self.admin_pin != DEFAULT_ADMIN_PIN
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("booth.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("store_url") {
                settings.store_url = v.clone();
            }
            if let Some(v) = file_cfg.get("store_api_key") {
                settings.store_api_key = v.clone();
            }
            if let Some(v) = file_cfg.get("admin_pin") {
                settings.admin_pin = v.clone();
            }
            if let Some(v) = file_cfg.get("database_url") {
                settings.database_url = v.clone();
            }
            if let Some(v) = file_cfg.get("status_bind") {
                settings.status_bind = v.clone();
            }
        }
    }

    if let Ok(v) = std::env::var("STORE_URL") {
        settings.store_url = v;
    }
    if let Ok(v) = std::env::var("APP__STORE_URL") {
        settings.store_url = v;
    }

    if let Ok(v) = std::env::var("STORE_API_KEY") {
        settings.store_api_key = v;
    }
    if let Ok(v) = std::env::var("APP__STORE_API_KEY") {
        settings.store_api_key = v;
    }

    if let Ok(v) = std::env::var("ADMIN_PIN") {
        settings.admin_pin = v;
    }
    if let Ok(v) = std::env::var("APP__ADMIN_PIN") {
        settings.admin_pin = v;
    }

    if let Ok(v) = std::env::var("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Ok(v) = std::env::var("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Ok(v) = std::env::var("STATUS_BIND") {
        settings.status_bind = v;
    }

    settings
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
