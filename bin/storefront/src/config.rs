//! Centralized storefront configuration.
//!
//! Loaded via the `config` crate from environment variables, with `__`
//! separating nested keys (`IDENTITY__API_KEY`, `IDENTITY__PROFILE_ENDPOINT`).
//!
//! See [`FirebaseConfig`] for the identity settings.

use agrokart_platform_access::FirebaseConfig;
use serde::Deserialize;

/// Storefront configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct StorefrontConfig {
    /// Identity provider settings, handed to the browser at startup.
    pub identity: FirebaseConfig,
}

impl StorefrontConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(
            config::Environment::default()
                .separator("__")
                .try_parsing(true),
        )
    }

    fn from_source<S>(source: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    #[test]
    fn identity_defaults_apply() {
        let config = StorefrontConfig::from_source(File::from_str(
            r#"{"identity": {"api_key": "web-key"}}"#,
            FileFormat::Json,
        ))
        .unwrap();

        assert_eq!(config.identity.api_key(), "web-key");
        assert_eq!(
            config.identity.auth_base_url(),
            "https://identitytoolkit.googleapis.com"
        );
        assert_eq!(config.identity.profile_endpoint(), None);
    }

    #[test]
    fn profile_endpoint_is_read() {
        let config = StorefrontConfig::from_source(File::from_str(
            r#"{"identity": {"api_key": "k", "profile_endpoint": "http://localhost:5000/api"}}"#,
            FileFormat::Json,
        ))
        .unwrap();

        assert_eq!(
            config.identity.profile_endpoint(),
            Some("http://localhost:5000/api")
        );
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let result = StorefrontConfig::from_source(File::from_str(
            r#"{"identity": {}}"#,
            FileFormat::Json,
        ));
        assert!(result.is_err());
    }
}
