// Viewer configuration - loaded from config.toml
//
// Provides sensible defaults if the config file is missing or has errors.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::ga::Backend;

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub graphics: GraphicsConfig,
    pub debug: DebugConfig,
}

/// Window settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: String::from("slate viewer"),
            width: 1280,
            height: 720,
        }
    }
}

/// Graphics settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    pub backend: String,
    pub buffer_count: u32,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            backend: String::from("vulkan"),
            buffer_count: 3,
        }
    }
}

/// Debug settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub validation: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self { validation: false }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults if not found
    pub fn load() -> Self {
        Self::load_from_path("config.toml").unwrap_or_else(|e| {
            log::warn!("Failed to load config.toml: {}. Using defaults.", e);
            Config::default()
        })
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        log::info!("Loaded configuration from {:?}", path);
        log::debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Get the configured backend tag
    pub fn get_backend(&self) -> Backend {
        match self.graphics.backend.to_lowercase().as_str() {
            "null" => Backend::Null,
            "dx12" => Backend::Dx12,
            "vulkan" => Backend::Vulkan,
            _ => {
                log::warn!(
                    "Unknown graphics backend '{}', defaulting to null",
                    self.graphics.backend
                );
                Backend::Null
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.graphics.buffer_count, 3);
        assert_eq!(config.get_backend(), Backend::Vulkan);
        assert!(!config.debug.validation);
    }

    #[test]
    fn parses_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [graphics]
            backend = "dx12"

            [window]
            width = 640
            "#,
        )
        .unwrap();

        assert_eq!(config.get_backend(), Backend::Dx12);
        assert_eq!(config.window.width, 640);
        // Unspecified fields keep their defaults.
        assert_eq!(config.window.height, 720);
        assert_eq!(config.graphics.buffer_count, 3);
    }

    #[test]
    fn backend_names_are_case_insensitive() {
        let config: Config = toml::from_str("[graphics]\nbackend = \"Vulkan\"\n").unwrap();
        assert_eq!(config.get_backend(), Backend::Vulkan);
    }

    #[test]
    fn unknown_backend_falls_back_to_null() {
        let config: Config = toml::from_str("[graphics]\nbackend = \"metal\"\n").unwrap();
        assert_eq!(config.get_backend(), Backend::Null);
    }
}
