use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::Context;
use shared::domain::PartnerEnvironment;
use tracing::warn;

use crate::api::DEFAULT_REGISTRATION_URL;

pub const SETTINGS_FILE: &str = "login.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSettings {
    pub registration_url: String,
    pub environment: PartnerEnvironment,
    pub debounce_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for LoginSettings {
    fn default() -> Self {
        Self {
            registration_url: DEFAULT_REGISTRATION_URL.into(),
            environment: PartnerEnvironment::Production,
            debounce_ms: 3_000,
            request_timeout_secs: 15,
        }
    }
}

impl LoginSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "registration_url" => self.registration_url = value.to_string(),
            "environment" => match value.parse() {
                Ok(environment) => self.environment = environment,
                Err(err) => warn!(%err, "ignoring environment setting"),
            },
            "debounce_ms" => {
                if let Ok(parsed) = value.trim().parse::<u64>() {
                    self.debounce_ms = parsed;
                }
            }
            "request_timeout_secs" => {
                if let Ok(parsed) = value.trim().parse::<u64>() {
                    self.request_timeout_secs = parsed;
                }
            }
            _ => {}
        }
    }
}

pub fn load_settings() -> LoginSettings {
    load_settings_from(SETTINGS_FILE)
}

pub const ENV_OVERRIDES: [(&str, &str); 4] = [
    ("registration_url", "APP__REGISTRATION_URL"),
    ("environment", "APP__ENVIRONMENT"),
    ("debounce_ms", "APP__DEBOUNCE_MS"),
    ("request_timeout_secs", "APP__REQUEST_TIMEOUT_SECS"),
];

/// File values first, then `APP__*` overrides from the process environment.
pub fn load_settings_from(path: impl AsRef<Path>) -> LoginSettings {
    load_settings_with_env(path, |var| std::env::var(var).ok())
}

/// Like [`load_settings_from`], reading overrides through `env`.
pub fn load_settings_with_env(
    path: impl AsRef<Path>,
    env: impl Fn(&str) -> Option<String>,
) -> LoginSettings {
    let mut settings = LoginSettings::default();

    match read_settings_file(path.as_ref()) {
        Ok(Some(file_cfg)) => {
            for (key, value) in &file_cfg {
                settings.apply(key, value);
            }
        }
        Ok(None) => {}
        Err(err) => warn!("{err:#}"),
    }

    for (key, var) in ENV_OVERRIDES {
        if let Some(v) = env(var) {
            settings.apply(key, &v);
        }
    }

    settings
}

fn read_settings_file(path: &Path) -> anyhow::Result<Option<HashMap<String, String>>> {
    let Ok(raw) = fs::read_to_string(path) else {
        return Ok(None);
    };
    let parsed = toml::from_str::<HashMap<String, toml::Value>>(&raw)
        .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;

    Ok(Some(
        parsed
            .into_iter()
            .filter_map(|(key, value)| {
                let value = match value {
                    toml::Value::String(s) => s,
                    toml::Value::Integer(i) => i.to_string(),
                    _ => return None,
                };
                Some((key, value))
            })
            .collect(),
    ))
}
