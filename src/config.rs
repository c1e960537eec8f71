//src/config.rs
use comfy_table::Color;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;
use thiserror::Error;

use crate::model::Theme;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_CONFIG_DIR: &str = "session-athlete";
const CONFIG_ENV_VAR: &str = "WORKOUT_SESSION_CONFIG_DIR"; // Environment variable name

/// Fixed per-minute estimate used for the calorie figure of a finished session.
pub const DEFAULT_CALORIES_PER_MINUTE: u32 = 7;

/// A failed store write is retried at most this many times.
pub const MAX_WRITE_RETRIES: u32 = 1;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine configuration directory.")]
    CannotDetermineConfigDir,
    #[error("I/O error accessing config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file (TOML): {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize config data (TOML): {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Invalid color name: {0}")]
    InvalidColor(String),
    #[error("Calories per minute must be positive.")]
    InvalidCalorieFactor,
    #[error("write_retries can be at most 1, got {0}")]
    TooManyWriteRetries(u32),
}

/// What happens to a WORK step whose log could not be written even after retrying.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WriteFailurePolicy {
    /// Stay on the step; the user validates again once the store is reachable.
    #[default]
    Block,
    /// Move on and remember the step as unsynced.
    MarkUnsynced,
}

/// Colour names accepted for theme accents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum StandardColor {
    Black, Red, Green, Yellow, Blue, Magenta, Cyan, White,
    DarkGrey, DarkRed, DarkGreen, DarkYellow, DarkBlue, DarkMagenta, DarkCyan, Grey,
}

impl From<StandardColor> for Color {
    fn from(value: StandardColor) -> Self {
        match value {
            StandardColor::Black => Color::Black, StandardColor::Red => Color::Red,
            StandardColor::Green => Color::Green, StandardColor::Yellow => Color::Yellow,
            StandardColor::Blue => Color::Blue, StandardColor::Magenta => Color::Magenta,
            StandardColor::Cyan => Color::Cyan, StandardColor::White => Color::White,
            StandardColor::DarkGrey => Color::DarkGrey, StandardColor::DarkRed => Color::DarkRed,
            StandardColor::DarkGreen => Color::DarkGreen, StandardColor::DarkYellow => Color::DarkYellow,
            StandardColor::DarkBlue => Color::DarkBlue, StandardColor::DarkMagenta => Color::DarkMagenta,
            StandardColor::DarkCyan => Color::DarkCyan, StandardColor::Grey => Color::Grey,
        }
    }
}

pub fn parse_color(color_str: &str) -> Result<StandardColor, ConfigError> {
    StandardColor::iter()
        .find(|color| format!("{color:?}").eq_ignore_ascii_case(color_str.trim()))
        .ok_or_else(|| ConfigError::InvalidColor(color_str.to_string()))
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ThemeConfig {
    pub default_accent: String,
    pub bbl_accent: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            default_accent: "Green".to_string(),
            bbl_accent: "Magenta".to_string(),
        }
    }
}

impl ThemeConfig {
    pub fn accent_for(&self, theme: Theme) -> Result<Color, ConfigError> {
        let name = match theme {
            Theme::Default => &self.default_accent,
            Theme::Bbl => &self.bbl_accent,
        };
        parse_color(name).map(Color::from)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub calories_per_minute: u32,
    /// Automatic retries after a failed store write, 0 or 1.
    pub write_retries: u32,
    pub on_write_failure: WriteFailurePolicy,
    pub theme: ThemeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            calories_per_minute: DEFAULT_CALORIES_PER_MINUTE,
            write_retries: MAX_WRITE_RETRIES,
            on_write_failure: WriteFailurePolicy::default(),
            theme: ThemeConfig::default(),
        }
    }
}

impl Config {
    /// Checks values that serde can't.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.calories_per_minute == 0 {
            return Err(ConfigError::InvalidCalorieFactor);
        }
        if self.write_retries > MAX_WRITE_RETRIES {
            return Err(ConfigError::TooManyWriteRetries(self.write_retries));
        }
        parse_color(&self.theme.default_accent)?;
        parse_color(&self.theme.bbl_accent)?;
        Ok(())
    }
}

/// Determines the path to the configuration file.
pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir_path = match std::env::var(CONFIG_ENV_VAR).ok() {
        Some(path_str) => {
            let path = PathBuf::from(path_str);
            if !path.is_dir() {
                tracing::warn!(
                    "Environment variable {} points to '{}', which is not a directory. Trying to create it.",
                    CONFIG_ENV_VAR,
                    path.display()
                );
                fs::create_dir_all(&path)?;
            }
            path
        }
        None => {
            let base_config_dir = dirs::config_dir().ok_or(ConfigError::CannotDetermineConfigDir)?;
            base_config_dir.join(APP_CONFIG_DIR)
        }
    };

    if !config_dir_path.exists() {
        fs::create_dir_all(&config_dir_path)?;
    }

    Ok(config_dir_path.join(CONFIG_FILE_NAME))
}

/// Loads the configuration from the TOML file at the given path.
/// A missing file is created with defaults.
pub fn load_config(config_path: &Path) -> Result<Config, ConfigError> {
    if !config_path.exists() {
        let default_config = Config::default();
        save_config(config_path, &default_config)?;
        return Ok(default_config);
    }
    let config_content = fs::read_to_string(config_path)?;
    let config: Config = toml::from_str(&config_content)?;
    config.validate()?;
    Ok(config)
}

/// Saves the configuration to the TOML file.
pub fn save_config(config_path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent_dir) = config_path.parent() {
        if !parent_dir.exists() {
            fs::create_dir_all(parent_dir)?;
        }
    }
    let config_content = toml::to_string_pretty(config)?;
    fs::write(config_path, config_content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_color_is_case_insensitive() {
        assert_eq!(parse_color("darkblue").unwrap(), StandardColor::DarkBlue);
        assert_eq!(parse_color(" GREEN ").unwrap(), StandardColor::Green);
        assert!(matches!(parse_color("neon"), Err(ConfigError::InvalidColor(_))));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config = toml::from_str("write_retries = 0\n").unwrap();
        assert_eq!(config.write_retries, 0);
        assert_eq!(config.calories_per_minute, DEFAULT_CALORIES_PER_MINUTE);
        assert_eq!(config.on_write_failure, WriteFailurePolicy::Block);
        assert_eq!(config.theme, ThemeConfig::default());
    }

    #[test]
    fn write_failure_policy_uses_kebab_case() {
        let config: Config = toml::from_str("on_write_failure = \"mark-unsynced\"\n").unwrap();
        assert_eq!(config.on_write_failure, WriteFailurePolicy::MarkUnsynced);
    }

    #[test]
    fn accent_follows_theme() {
        let theme = ThemeConfig::default();
        assert_eq!(theme.accent_for(Theme::Default).unwrap(), Color::Green);
        assert_eq!(theme.accent_for(Theme::Bbl).unwrap(), Color::Magenta);
    }

    #[test]
    fn zero_calorie_factor_is_rejected() {
        let config = Config {
            calories_per_minute: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidCalorieFactor)));
    }

    #[test]
    fn write_retries_above_one_are_rejected() {
        let config: Config = toml::from_str("write_retries = 5\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooManyWriteRetries(5))
        ));
        let config: Config = toml::from_str("write_retries = 1\n").unwrap();
        assert!(config.validate().is_ok());
    }
}
