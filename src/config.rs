//! Configuration file support for the tour editor.
//!
//! This module provides serialization and deserialization of application settings,
//! allowing users to tune the core limits and rebind shortcuts.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAX_CACHE_SIZE, DEFAULT_MAX_HISTORY_SIZE, DEFAULT_MAX_LOADED_SCENES,
    DEFAULT_THUMBNAIL_SIZE, DEFAULT_TRANSITION_DURATION_MS,
};
use crate::history::HistoryConfig;
use crate::input::{EditorCommand, KeyCombo, ShortcutMap};
use crate::loader::LoaderConfig;
use crate::scene_cache::SwitchOptions;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration that can be exported and imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Application name (for identification)
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// User preferences
    #[serde(default)]
    pub preferences: UserPreferences,

    /// Shortcut overrides applied on top of the default bindings
    #[serde(default)]
    pub shortcuts: Vec<ShortcutConfig>,
}

fn default_app_name() -> String {
    "pano-tour".to_string()
}

/// User preferences section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Scenes allowed to keep decoded resources at once
    #[serde(default = "default_max_loaded_scenes")]
    pub max_loaded_scenes: usize,

    /// Undo depth
    #[serde(default = "default_max_history_size")]
    pub max_history_size: usize,

    /// Longest thumbnail edge in pixels
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,

    /// Decoded results kept by the loader
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: usize,

    /// Scene switch transition length
    #[serde(default = "default_transition_duration_ms")]
    pub transition_duration_ms: u32,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_max_loaded_scenes() -> usize {
    DEFAULT_MAX_LOADED_SCENES
}

fn default_max_history_size() -> usize {
    DEFAULT_MAX_HISTORY_SIZE
}

fn default_thumbnail_size() -> u32 {
    DEFAULT_THUMBNAIL_SIZE
}

fn default_max_cache_size() -> usize {
    DEFAULT_MAX_CACHE_SIZE
}

fn default_transition_duration_ms() -> u32 {
    DEFAULT_TRANSITION_DURATION_MS
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            max_loaded_scenes: default_max_loaded_scenes(),
            max_history_size: default_max_history_size(),
            thumbnail_size: default_thumbnail_size(),
            max_cache_size: default_max_cache_size(),
            transition_duration_ms: default_transition_duration_ms(),
            log_level: LogLevel::default(),
        }
    }
}

/// One shortcut override.
///
/// A command of `null` unbinds the combo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutConfig {
    /// Key combination, e.g. `"ctrl+shift+z"`
    pub combo: KeyCombo,
    /// Command to bind, or none to remove the binding
    pub command: Option<EditorCommand>,
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            app_name: default_app_name(),
            preferences: UserPreferences::default(),
            shortcuts: Vec::new(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Write the configuration, creating parent directories if needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get the default filename for config export.
    pub fn default_filename() -> &'static str {
        "pano-tour-config.json"
    }

    /// Get the default config file path for auto-load/save.
    pub fn default_path() -> Option<std::path::PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("pano-tour").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("pano-tour")
                    .join(Self::default_filename())
            })
        }
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load(&path) {
            Ok(config) => {
                log::info!("Loaded configuration from {:?}", path);
                Some(config)
            }
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to the default path.
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save(&path)
    }

    /// Default bindings with the configured overrides applied in order.
    pub fn to_shortcut_map(&self) -> ShortcutMap {
        let mut map = ShortcutMap::new();
        for shortcut in &self.shortcuts {
            match shortcut.command {
                Some(command) => map.register(shortcut.combo.clone(), command),
                None => {
                    map.unregister(shortcut.combo.clone());
                }
            }
        }
        map
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            max_cache_size: self.preferences.max_cache_size,
            thumbnail_size: self.preferences.thumbnail_size,
        }
    }

    pub fn history_config(&self) -> HistoryConfig {
        HistoryConfig {
            max_size: self.preferences.max_history_size,
        }
    }

    pub fn switch_options(&self) -> SwitchOptions {
        SwitchOptions {
            transition_duration_ms: self.preferences.transition_duration_ms,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_core_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.loader_config(), LoaderConfig::default());
        assert_eq!(config.history_config(), HistoryConfig::default());
        assert_eq!(config.switch_options(), SwitchOptions::default());
        assert_eq!(config.preferences.max_loaded_scenes, DEFAULT_MAX_LOADED_SCENES);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = AppConfig::new();
        config.preferences.max_loaded_scenes = 3;
        config.preferences.log_level = LogLevel::Debug;
        config.shortcuts.push(ShortcutConfig {
            combo: KeyCombo::parse("ctrl+shift+z"),
            command: Some(EditorCommand::Redo),
        });

        let json = config.to_json().unwrap();
        assert!(json.contains("\"CTRL+SHIFT+Z\""));
        assert!(json.contains("\"redo\""));
        assert_eq!(AppConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = AppConfig::from_json(r#"{"version": 1, "preferences": {"thumbnail_size": 128}}"#)
            .unwrap();
        assert_eq!(config.app_name, "pano-tour");
        assert_eq!(config.preferences.thumbnail_size, 128);
        assert_eq!(config.preferences.max_cache_size, DEFAULT_MAX_CACHE_SIZE);
        assert_eq!(config.preferences.log_level, LogLevel::Info);
        assert!(config.shortcuts.is_empty());
    }

    #[test]
    fn test_newer_version_rejected() {
        let json = format!("{{\"version\": {}}}", CONFIG_VERSION + 1);
        assert!(matches!(
            AppConfig::from_json(&json),
            Err(ConfigError::VersionTooNew { .. })
        ));
        assert!(matches!(
            AppConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_shortcut_overrides() {
        let mut config = AppConfig::new();
        config.shortcuts = vec![
            ShortcutConfig {
                combo: KeyCombo::parse("ctrl+shift+z"),
                command: Some(EditorCommand::Redo),
            },
            ShortcutConfig {
                combo: KeyCombo::parse("h"),
                command: None,
            },
        ];
        let map = config.to_shortcut_map();
        assert_eq!(
            map.command_for(&KeyCombo::parse("ctrl+shift+z")),
            Some(EditorCommand::Redo)
        );
        assert_eq!(map.command_for(&KeyCombo::parse("h")), None);
        assert_eq!(map.command_for(&KeyCombo::parse("ctrl+z")), Some(EditorCommand::Undo));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = AppConfig::new();
        config.preferences.max_history_size = 10;

        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), config);
        assert!(matches!(
            AppConfig::load(&dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_log_level_filter() {
        assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
        assert_eq!(LogLevel::default().to_level_filter(), log::LevelFilter::Info);
    }
}
