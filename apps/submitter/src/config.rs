use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use widget_core::WidgetOptions;

type FileConfig = HashMap<String, toml::Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub host_url: String,
    pub widget: WidgetOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host_url: "http://127.0.0.1:8787".into(),
            widget: WidgetOptions::default(),
        }
    }
}

/// `submitter.toml` is optional; a file named on the command line is not.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    let env = |key: &str| std::env::var(key).ok();
    match explicit {
        Some(file) => load_settings_required(file, env),
        None => Ok(load_settings_from(Path::new("submitter.toml"), env)),
    }
}

pub fn load_settings_from(file: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(file) {
        if let Ok(file_cfg) = toml::from_str::<FileConfig>(&raw) {
            apply_file(&mut settings, &file_cfg);
        }
    }

    apply_env(&mut settings, env);
    settings
}

pub fn load_settings_required(
    file: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings> {
    let raw = fs::read_to_string(file)
        .with_context(|| format!("failed to read config '{}'", file.display()))?;
    let file_cfg = toml::from_str::<FileConfig>(&raw)
        .with_context(|| format!("invalid config '{}'", file.display()))?;

    let mut settings = Settings::default();
    apply_file(&mut settings, &file_cfg);
    apply_env(&mut settings, env);
    Ok(settings)
}

fn apply_file(settings: &mut Settings, file_cfg: &FileConfig) {
    let text = |key: &str| {
        file_cfg
            .get(key)
            .and_then(toml::Value::as_str)
            .map(str::to_string)
    };
    if let Some(v) = text("host_url") {
        settings.host_url = v;
    }
    if let Some(v) = text("primary_module") {
        settings.widget.primary_module = v;
    }
    if let Some(v) = text("secondary_module") {
        settings.widget.secondary_module = v;
    }
    if let Some(v) = text("account_function") {
        settings.widget.account_function = v;
    }
    if let Some(ms) = file_cfg
        .get("progress_min_display_ms")
        .and_then(toml::Value::as_integer)
        .and_then(|ms| u64::try_from(ms).ok())
    {
        settings.widget.progress_min_display = Duration::from_millis(ms);
    }
}

fn apply_env(settings: &mut Settings, env: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env("CRM_HOST_URL") {
        settings.host_url = v;
    }
    if let Some(v) = env("APP__HOST_URL") {
        settings.host_url = v;
    }
    if let Some(v) = env("APP__PRIMARY_MODULE") {
        settings.widget.primary_module = v;
    }
    if let Some(v) = env("APP__SECONDARY_MODULE") {
        settings.widget.secondary_module = v;
    }
    if let Some(v) = env("APP__ACCOUNT_FUNCTION") {
        settings.widget.account_function = v;
    }
    if let Some(v) = env("APP__PROGRESS_MIN_DISPLAY_MS") {
        if let Ok(ms) = v.parse::<u64>() {
            settings.widget.progress_min_display = Duration::from_millis(ms);
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
