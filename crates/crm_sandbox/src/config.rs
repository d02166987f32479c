use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::store::SandboxStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: String,
    pub fixture_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8787".into(),
            fixture_path: None,
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new("sandbox.toml"), |key| std::env::var(key).ok())
}

/// Defaults, then the TOML file if it parses, then environment overrides.
pub fn load_settings_from(file: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(file) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("bind_addr") {
                settings.bind_addr = v.clone();
            }
            if let Some(v) = file_cfg.get("fixture_path") {
                settings.fixture_path = Some(PathBuf::from(v));
            }
        }
    }

    if let Some(v) = env("SANDBOX_BIND") {
        settings.bind_addr = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.bind_addr = v;
    }
    if let Some(v) = env("APP__FIXTURE_PATH") {
        settings.fixture_path = Some(PathBuf::from(v));
    }

    settings
}

/// Seeds the store from the fixture file, or with the demo records.
pub fn load_store(settings: &Settings) -> anyhow::Result<SandboxStore> {
    let Some(path) = &settings.fixture_path else {
        return Ok(SandboxStore::demo());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read fixture '{}'", path.display()))?;
    SandboxStore::from_fixture(&raw)
        .with_context(|| format!("invalid fixture '{}'", path.display()))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
