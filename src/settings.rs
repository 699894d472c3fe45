use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AcademyError, Result};

pub const CONFIG_DIR_ENV: &str = "ACADEMY_CONFIG_DIR";
pub const REMOTE_URL_ENV: &str = "ACADEMY_REMOTE_URL";
pub const REMOTE_KEY_ENV: &str = "ACADEMY_REMOTE_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub remote_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            user_name: String::new(),
            remote_url: None,
            remote_key: None,
        }
    }
}

impl Settings {
    /// Both the URL and the key, or nothing.
    pub fn remote_credentials(&self) -> Option<(&str, &str)> {
        let url = self.remote_url.as_deref().filter(|u| !u.trim().is_empty())?;
        let key = self.remote_key.as_deref().filter(|k| !k.trim().is_empty())?;
        Some((url, key))
    }

    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("academy.db")
    }

    fn apply_env(mut self) -> Self {
        if let Ok(url) = std::env::var(REMOTE_URL_ENV) {
            self.remote_url = Some(url);
        }
        if let Ok(key) = std::env::var(REMOTE_KEY_ENV) {
            self.remote_key = Some(key);
        }
        self
    }
}

fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("academy")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("academy")
}

/// Settings as effective for this process, environment overrides applied.
pub fn load_settings() -> Settings {
    load_settings_file().apply_env()
}

/// Settings exactly as stored on disk. Use this to edit and save them.
pub fn load_settings_file() -> Settings {
    read_settings(&settings_path())
}

fn read_settings(path: &Path) -> Settings {
    if path.exists() {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| AcademyError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn get_data_dir() -> PathBuf {
    PathBuf::from(&load_settings().data_dir)
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}
