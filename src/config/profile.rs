//! YouTrack profile configuration.

use serde::{Deserialize, Serialize};

use super::{ConfigError, Result};

/// A YouTrack profile configuration.
///
/// Profiles store connection details for a YouTrack instance.
/// Permanent tokens are stored separately in the OS keychain for security.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// The name of this profile.
    ///
    /// Must be non-empty and unique across all profiles. Doubles as the
    /// keyring username for the profile's permanent token.
    pub name: String,

    /// The YouTrack instance URL.
    ///
    /// Should be a valid HTTPS URL (e.g., "https://company.youtrack.cloud").
    pub url: String,
}

impl Profile {
    /// Create a new profile.
    pub fn new(name: String, url: String) -> Self {
        Self { name, url }
    }

    /// Validate this profile.
    ///
    /// Checks that:
    /// - The name is non-empty and has no whitespace
    /// - The URL is non-empty and has a valid format
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError::ValidationError` with details if validation fails.
    pub fn validate(&self) -> Result<()> {
        // Validate name
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "profile name cannot be empty".to_string(),
            ));
        }

        if self.name.contains(char::is_whitespace) {
            return Err(ConfigError::ValidationError(format!(
                "profile name '{}' cannot contain whitespace",
                self.name
            )));
        }

        // Validate URL
        if self.url.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': URL cannot be empty",
                self.name
            )));
        }

        if !self.url.starts_with("https://") && !self.url.starts_with("http://") {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': URL must start with http:// or https://",
                self.name
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_creation() {
        let profile = Profile::new(
            "work".to_string(),
            "https://company.youtrack.cloud".to_string(),
        );

        assert_eq!(profile.name, "work");
        assert_eq!(profile.url, "https://company.youtrack.cloud");
    }

    #[test]
    fn test_valid_profile() {
        let profile = Profile::new(
            "work".to_string(),
            "https://company.youtrack.cloud".to_string(),
        );

        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let profile = Profile::new(
            "".to_string(),
            "https://company.youtrack.cloud".to_string(),
        );

        let result = profile.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("name cannot be empty"));
    }

    #[test]
    fn test_whitespace_name_rejected() {
        let profile = Profile::new(
            "my work".to_string(),
            "https://company.youtrack.cloud".to_string(),
        );

        let result = profile.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cannot contain whitespace"));
    }

    #[test]
    fn test_empty_url_rejected() {
        let profile = Profile::new("work".to_string(), "".to_string());

        let result = profile.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("URL cannot be empty"));
    }

    #[test]
    fn test_invalid_url_scheme_rejected() {
        let profile = Profile::new(
            "work".to_string(),
            "company.youtrack.cloud".to_string(),
        );

        let result = profile.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must start with http"));
    }

    #[test]
    fn test_http_url_accepted() {
        let profile = Profile::new("local".to_string(), "http://localhost:8080".to_string());

        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_profile_serialization() {
        let profile = Profile::new(
            "work".to_string(),
            "https://company.youtrack.cloud".to_string(),
        );

        let toml_str = toml::to_string(&profile).unwrap();
        let parsed: Profile = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed, profile);
    }
}
