//! Configuration management for LazyTrack.
//!
//! This module handles loading, saving, and managing user configuration
//! including profiles and application settings.

mod profile;
mod settings;

pub use profile::Profile;
pub use settings::Settings;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while handling configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine configuration directory")]
    NoConfigDir,

    /// The config directory could not be created.
    #[error("failed to create configuration directory: {0}")]
    CreateDirError(std::io::Error),

    /// The config file could not be read.
    #[error("failed to read configuration file: {0}")]
    ReadError(std::io::Error),

    /// The config file could not be written.
    #[error("failed to write configuration file: {0}")]
    WriteError(std::io::Error),

    /// The config file is not valid TOML.
    #[error("failed to parse configuration file: {0}")]
    ParseError(toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize configuration: {0}")]
    SerializeError(toml::ser::Error),

    /// A profile or setting failed validation.
    #[error("{0}")]
    ValidationError(String),

    /// A requested profile does not exist.
    #[error("profile '{0}' not found")]
    ProfileNotFound(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// The application configuration: profiles plus settings.
///
/// Stored as TOML at `{config_dir}/lazytrack/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// The configured YouTrack profiles.
    #[serde(default)]
    pub profiles: Vec<Profile>,
    /// Application-wide settings.
    #[serde(default)]
    pub settings: Settings,
}

impl Config {
    /// Load the configuration from the default location.
    ///
    /// A missing config file yields the default (empty) configuration so
    /// that first runs can guide the user through setup.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load the configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&contents).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save the configuration to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::CreateDirError)?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?;
        std::fs::write(path, contents).map_err(ConfigError::WriteError)
    }

    /// The path of the config file.
    pub fn config_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join("lazytrack").join("config.toml"))
    }

    /// Validate the whole configuration.
    ///
    /// Checks every profile, rejects duplicate profile names, and checks
    /// that the default profile (when set) exists.
    pub fn validate(&self) -> Result<()> {
        for profile in &self.profiles {
            profile.validate()?;
        }

        for (i, profile) in self.profiles.iter().enumerate() {
            if self.profiles[..i].iter().any(|p| p.name == profile.name) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate profile name '{}'",
                    profile.name
                )));
            }
        }

        if let Some(default) = &self.settings.default_profile {
            if !self.profiles.iter().any(|p| &p.name == default) {
                return Err(ConfigError::ValidationError(format!(
                    "default profile '{}' does not exist",
                    default
                )));
            }
        }

        Ok(())
    }

    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))
    }

    /// The profile to use when none was requested: the configured default,
    /// falling back to the first profile.
    pub fn default_profile(&self) -> Option<&Profile> {
        if let Some(name) = &self.settings.default_profile {
            return self.profiles.iter().find(|p| &p.name == name);
        }
        self.profiles.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            profiles: vec![
                Profile::new("work".to_string(), "https://work.youtrack.cloud".to_string()),
                Profile::new("home".to_string(), "https://home.youtrack.cloud".to_string()),
            ],
            settings: Settings::default(),
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = test_config();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.profiles, config.profiles);
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let result = Config::load_from(&path);
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }

    #[test]
    fn test_load_from_invalid_toml_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "profiles = not valid").unwrap();

        let result = Config::load_from(&path);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let config = Config {
            profiles: vec![
                Profile::new("work".to_string(), "https://a.youtrack.cloud".to_string()),
                Profile::new("work".to_string(), "https://b.youtrack.cloud".to_string()),
            ],
            settings: Settings::default(),
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn test_validate_rejects_unknown_default_profile() {
        let mut config = test_config();
        config.settings.default_profile = Some("missing".to_string());

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_profile_lookup() {
        let config = test_config();
        assert_eq!(config.profile("home").unwrap().name, "home");
        assert!(matches!(
            config.profile("missing"),
            Err(ConfigError::ProfileNotFound(_))
        ));
    }

    #[test]
    fn test_default_profile_falls_back_to_first() {
        let config = test_config();
        assert_eq!(config.default_profile().unwrap().name, "work");

        let mut with_default = test_config();
        with_default.settings.default_profile = Some("home".to_string());
        assert_eq!(with_default.default_profile().unwrap().name, "home");
    }

    #[test]
    fn test_empty_config_has_no_default_profile() {
        let config = Config::default();
        assert!(config.default_profile().is_none());
    }
}
