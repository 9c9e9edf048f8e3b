use anyhow::Context;
use config::{Config, Environment, File};
use serde::Deserialize;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://./data/election.db";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub bind_addr: String,
    pub database_url: String,
    pub administrator: String,
    pub auth_secret: String,
    pub token_ttl_seconds: i64,
    pub event_buffer: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8443".into(),
            database_url: DEFAULT_DATABASE_URL.into(),
            administrator: "admin".into(),
            auth_secret: "devsecret".into(),
            token_ttl_seconds: 3600,
            event_buffer: 256,
        }
    }
}

/// Defaults, then `server.toml` if present, then `APP__*` variables.
pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from("server")
}

pub(crate) fn load_settings_from(file_stem: &str) -> anyhow::Result<Settings> {
    let defaults = Settings::default();
    let settings: Settings = Config::builder()
        .set_default("bind_addr", defaults.bind_addr)?
        .set_default("database_url", defaults.database_url)?
        .set_default("administrator", defaults.administrator)?
        .set_default("auth_secret", defaults.auth_secret)?
        .set_default("token_ttl_seconds", defaults.token_ttl_seconds)?
        .set_default("event_buffer", defaults.event_buffer as u64)?
        .add_source(File::with_name(file_stem).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()
        .context("failed to assemble server settings")?
        .try_deserialize()
        .context("invalid server settings")?;

    if settings.administrator.trim().is_empty() {
        anyhow::bail!("administrator must not be empty");
    }
    if settings.event_buffer == 0 {
        anyhow::bail!("event_buffer must be at least 1");
    }
    Ok(settings)
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return DEFAULT_DATABASE_URL.to_string();
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
