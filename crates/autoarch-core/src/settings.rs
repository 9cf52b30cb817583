//! Editor settings stored in `~/.autoarch/settings.json`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

pub const API_URL_ENV: &str = "AUTOARCH_API_URL";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PROJECT_NAME: &str = "my-awesome-project";

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_project_name() -> String {
    DEFAULT_PROJECT_NAME.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditorSettings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_project_name")]
    pub default_project_name: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_timeout_secs(),
            default_project_name: default_project_name(),
        }
    }
}

impl EditorSettings {
    /// Applies `AUTOARCH_API_URL` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_api_url_override(std::env::var(API_URL_ENV).ok())
    }

    /// Replaces the base URL when `value` is set and not blank.
    pub fn with_api_url_override(mut self, value: Option<String>) -> Self {
        if let Some(url) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            self.api_base_url = url;
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Base URL without a trailing slash, ready for path joins.
    pub fn api_base(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}

/// Resolve the settings directory (~/.autoarch/).
pub fn settings_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".autoarch")
}

pub fn settings_path() -> PathBuf {
    settings_dir().join("settings.json")
}

/// Reads settings from the home directory, with env overrides applied.
pub fn read_settings() -> EditorSettings {
    read_settings_from(&settings_path()).with_env_overrides()
}

/// Missing or unreadable files yield defaults.
pub fn read_settings_from(path: &Path) -> EditorSettings {
    if !path.exists() {
        return EditorSettings::default();
    }
    let parsed = fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()));
    match parsed {
        Ok(settings) => settings,
        Err(error) => {
            warn!(path = %path.display(), %error, "unreadable settings, using defaults");
            EditorSettings::default()
        }
    }
}

pub fn write_settings(settings: &EditorSettings) -> Result<()> {
    write_settings_to(&settings_path(), settings)
}

/// Writes through a temp file and rename so readers never see a partial file.
pub fn write_settings_to(path: &Path, settings: &EditorSettings) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = read_settings_from(&dir.path().join("settings.json"));
        assert_eq!(settings, EditorSettings::default());
        assert_eq!(settings.api_base_url, "http://localhost:8000");
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
        assert_eq!(settings.default_project_name, "my-awesome-project");
    }

    #[test]
    fn garbage_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").expect("write");
        assert_eq!(read_settings_from(&path), EditorSettings::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"apiBaseUrl": "http://arch.internal:9000"}"#).expect("write");
        let settings = read_settings_from(&path);
        assert_eq!(settings.api_base_url, "http://arch.internal:9000");
        assert_eq!(settings.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("settings.json");
        let settings = EditorSettings {
            request_timeout_secs: 5,
            default_project_name: "shop".into(),
            ..EditorSettings::default()
        };
        write_settings_to(&path, &settings).expect("write");
        assert_eq!(read_settings_from(&path), settings);
        assert!(!path.with_extension("json.tmp").exists());

        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.contains("\"requestTimeoutSecs\": 5"));
    }

    #[rstest]
    #[case(None, DEFAULT_API_BASE_URL)]
    #[case(Some(""), DEFAULT_API_BASE_URL)]
    #[case(Some("   "), DEFAULT_API_BASE_URL)]
    #[case(Some("https://api.example.com "), "https://api.example.com")]
    fn api_url_override(#[case] value: Option<&str>, #[case] expected: &str) {
        let settings = EditorSettings::default().with_api_url_override(value.map(String::from));
        assert_eq!(settings.api_base_url, expected);
    }

    #[test]
    fn base_trims_trailing_slash() {
        let settings = EditorSettings::default()
            .with_api_url_override(Some("http://localhost:8000/".into()));
        assert_eq!(settings.api_base(), "http://localhost:8000");
    }

    #[test]
    fn zero_timeout_is_floored() {
        let settings = EditorSettings {
            request_timeout_secs: 0,
            ..EditorSettings::default()
        };
        assert_eq!(settings.request_timeout(), Duration::from_secs(1));
    }
}
