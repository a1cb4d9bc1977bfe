use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use client_core::{polling::DEFAULT_POLL_INTERVAL, DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "marketmind.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_url: Option<String>,
    request_timeout_secs: Option<u64>,
    poll_interval_secs: Option<u64>,
}

/// Defaults, then the config file, then the environment. An explicit `path`
/// must exist; the default `marketmind.toml` is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (file, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(&file) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse config file '{}'", file.display()))?,
        Err(err) if !required && err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", file.display()))
        }
    }

    apply_env(&mut settings, |key| env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file.api_url {
        settings.api_url = v;
    }
    if let Some(secs) = file.request_timeout_secs {
        settings.request_timeout = timeout_from_secs(secs);
    }
    if let Some(secs) = file.poll_interval_secs {
        settings.poll_interval = Duration::from_secs(secs);
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("MARKETMIND_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = lookup("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(secs) = lookup("APP__REQUEST_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()) {
        settings.request_timeout = timeout_from_secs(secs);
    }
    if let Some(secs) = lookup("APP__POLL_INTERVAL_SECS").and_then(|v| v.trim().parse().ok()) {
        settings.poll_interval = Duration::from_secs(secs);
    }
}

fn timeout_from_secs(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}

/// Command-line flags win over everything else.
pub fn apply_overrides(settings: &mut Settings, api_url: Option<&str>, poll_secs: Option<u64>) {
    if let Some(v) = api_url {
        settings.api_url = v.trim().to_string();
    }
    if let Some(secs) = poll_secs {
        settings.poll_interval = Duration::from_secs(secs);
    }
}

pub fn validate_api_url(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid API base url '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("unsupported scheme '{}' in API base url '{raw}'", url.scheme());
    }
    Ok(url)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
