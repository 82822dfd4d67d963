use std::{collections::HashMap, fs, path::Path, time::Duration};

use crate::{
    error::PollConfigError,
    poller::{duration_millis, PollConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL},
};

pub const SETTINGS_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Base url of the backend serving `/api/meetings/{id}`.
    pub java_api_url: String,
    /// Base url of the backend serving `/profiles/{uid}/`.
    pub api_url: String,
    pub poll_max_attempts: u32,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            java_api_url: "http://127.0.0.1:8080".into(),
            api_url: "http://127.0.0.1:8000".into(),
            poll_max_attempts: DEFAULT_MAX_ATTEMPTS,
            poll_interval_ms: duration_millis(DEFAULT_POLL_INTERVAL),
            request_timeout_secs: 15,
        }
    }
}

impl ClientSettings {
    pub fn poll_config(&self) -> Result<PollConfig, PollConfigError> {
        PollConfig::new(
            self.poll_max_attempts,
            Duration::from_millis(self.poll_interval_ms),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, env);

    settings
}

fn apply_file_overrides(settings: &mut ClientSettings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        return;
    };

    let text = |key: &str| {
        file_cfg.get(key).and_then(|value| match value {
            toml::Value::String(s) => Some(s.clone()),
            toml::Value::Integer(n) => Some(n.to_string()),
            _ => None,
        })
    };

    if let Some(v) = text("java_api_url") {
        settings.java_api_url = v;
    }
    if let Some(v) = text("api_url") {
        settings.api_url = v;
    }
    if let Some(v) = text("poll_max_attempts").and_then(|v| v.parse().ok()) {
        settings.poll_max_attempts = v;
    }
    if let Some(v) = text("poll_interval_ms").and_then(|v| v.parse().ok()) {
        settings.poll_interval_ms = v;
    }
    if let Some(v) = text("request_timeout_secs").and_then(|v| v.parse().ok()) {
        settings.request_timeout_secs = v;
    }
}

fn apply_env_overrides(settings: &mut ClientSettings, env: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env("JAVA_API_URL") {
        settings.java_api_url = v;
    }
    if let Some(v) = env("APP__JAVA_API_URL") {
        settings.java_api_url = v;
    }

    if let Some(v) = env("API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = env("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(parsed) = env("APP__POLL_MAX_ATTEMPTS").and_then(|v| v.parse().ok()) {
        settings.poll_max_attempts = parsed;
    }
    if let Some(parsed) = env("APP__POLL_INTERVAL_MS").and_then(|v| v.parse().ok()) {
        settings.poll_interval_ms = parsed;
    }
    if let Some(parsed) = env("APP__REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        settings.request_timeout_secs = parsed;
    }
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
