//! Harness settings
//!
//! Optional JSON file named by `STRESS3D_SETTINGS`. Anything missing from
//! the file falls back to its default; an unreadable or malformed file is
//! reported and the defaults are used instead.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stress_render::window::WindowConfig;
use thiserror::Error;

pub const SETTINGS_ENV: &str = "STRESS3D_SETTINGS";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file {}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        let config = WindowConfig::default();
        Self {
            title: config.title,
            width: config.width,
            height: config.height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessSettings {
    pub window: WindowSettings,
    pub vsync: bool,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            window: WindowSettings::default(),
            vsync: true,
        }
    }
}

impl HarnessSettings {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&text).map_err(|source| SettingsError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Settings from the file named in the environment, or defaults.
    pub fn from_env() -> Self {
        let Some(path) = std::env::var_os(SETTINGS_ENV) else {
            return Self::default();
        };
        match Self::load(Path::new(&path)) {
            Ok(settings) => settings,
            Err(err) => {
                let cause = std::error::Error::source(&err)
                    .map(ToString::to_string)
                    .unwrap_or_default();
                tracing::warn!(error = %err, %cause, "ignoring settings file");
                Self::default()
            }
        }
    }

    pub fn window_config(&self) -> WindowConfig {
        WindowConfig {
            title: self.window.title.clone(),
            width: self.window.width.max(1),
            height: self.window.height.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "stress3d-{}-{}.json",
            name,
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("stress3d-definitely-missing.json");
        let settings = HarnessSettings::load(&path).unwrap();
        assert_eq!(settings, HarnessSettings::default());
        assert!(settings.vsync);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let path = scratch_file("partial", r#"{ "window": { "width": 800 }, "vsync": false }"#);
        let settings = HarnessSettings::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.window.width, 800);
        assert_eq!(settings.window.height, WindowSettings::default().height);
        assert_eq!(settings.window.title, "stress3d");
        assert!(!settings.vsync);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = scratch_file("malformed", "{ not json");
        let result = HarnessSettings::load(&path);
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(SettingsError::Json { .. })));
    }

    #[test]
    fn window_config_never_zero_sized() {
        let mut settings = HarnessSettings::default();
        settings.window.width = 0;
        let config = settings.window_config();
        assert_eq!(config.width, 1);
        assert_eq!(config.height, 720);
    }
}
