//! Harness configuration

use std::path::Path;

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Where the PowerAuth server under test lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/powerauth-java-server".to_string(),
            timeout_ms: 4000,
        }
    }
}

/// Application the harness registers (or reuses) on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    pub application_name: String,
    pub application_version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            application_name: "PowerAuthJsTestClient-Application".to_string(),
            application_version: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestUserConfig {
    pub user_id: String,
    pub alt_user_id: String,
    pub external_user_id: String,
}

impl Default for TestUserConfig {
    fn default() -> Self {
        Self {
            user_id: "PowerAuthJsTestClient-User".to_string(),
            alt_user_id: "PowerAuthJsTestClient-UserAlt".to_string(),
            external_user_id: "PowerAuthJsTestClient-ExternalUser".to_string(),
        }
    }
}

/// Credentials of a mobile application version.
///
/// `master_server_public_key` is a base64 encoded P-256 point.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSetup {
    pub app_key: String,
    pub app_secret: String,
    pub master_server_public_key: String,
}

impl std::fmt::Debug for ApplicationSetup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationSetup")
            .field("app_key", &self.app_key)
            .field("app_secret", &"<redacted>")
            .field("master_server_public_key", &self.master_server_public_key)
            .finish()
    }
}

impl ApplicationSetup {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_key.is_empty() {
            return Err(ConfigError::Invalid("app_key must not be empty".to_string()));
        }
        if self.app_secret.is_empty() {
            return Err(ConfigError::Invalid("app_secret must not be empty".to_string()));
        }
        let key = B64
            .decode(&self.master_server_public_key)
            .map_err(|e| ConfigError::Invalid(format!("master_server_public_key: {}", e)))?;
        pa_crypto::ec::parse_public_key(&key)
            .map_err(|e| ConfigError::Invalid(format!("master_server_public_key: {}", e)))?;
        Ok(())
    }
}

/// Top-level harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub connection: ConnectionConfig,
    pub application: ApplicationConfig,
    pub test_user: TestUserConfig,
    /// Present once an application version has been created on the server.
    pub setup: Option<ApplicationSetup>,
}

impl HarnessConfig {
    /// Load configuration from defaults, TOML file and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("PA_HARNESS_CONFIG") {
            Ok(path) => Self::load_from_toml(&path)?,
            Err(_) => Self::default(),
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Load from TOML config file; missing keys take their defaults.
    pub fn load_from_toml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `PA_*` overrides read through `lookup`.
    ///
    /// Setup overrides need all three of key, secret and master key unless a
    /// setup is already present.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("PA_BASE_URL") {
            self.connection.base_url = url;
        }

        let app_key = lookup("PA_APP_KEY");
        let app_secret = lookup("PA_APP_SECRET");
        let master_key = lookup("PA_MASTER_PUBLIC_KEY");
        if app_key.is_none() && app_secret.is_none() && master_key.is_none() {
            return Ok(());
        }

        let mut setup = match self.setup.take() {
            Some(setup) => setup,
            None => match (&app_key, &app_secret, &master_key) {
                (Some(_), Some(_), Some(_)) => ApplicationSetup {
                    app_key: String::new(),
                    app_secret: String::new(),
                    master_server_public_key: String::new(),
                },
                _ => {
                    return Err(ConfigError::Invalid(
                        "PA_APP_KEY, PA_APP_SECRET and PA_MASTER_PUBLIC_KEY must be set together"
                            .to_string(),
                    ))
                }
            },
        };
        if let Some(v) = app_key {
            setup.app_key = v;
        }
        if let Some(v) = app_secret {
            setup.app_secret = v;
        }
        if let Some(v) = master_key {
            setup.master_server_public_key = v;
        }
        self.setup = Some(setup);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection.base_url.is_empty() {
            return Err(ConfigError::Invalid("base_url must not be empty".to_string()));
        }
        if self.connection.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be > 0".to_string()));
        }
        if let Some(setup) = &self.setup {
            setup.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    // Compressed public key of the scalar 0x0101..01.
    const MASTER_KEY: &str = "Am/wO5SSQc4drdQ1GeaWDgqFtBppoFwygQOqK84VlMoW";

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.connection.base_url, "http://localhost:8080/powerauth-java-server");
        assert_eq!(config.connection.timeout_ms, 4000);
        assert_eq!(config.application.application_name, "PowerAuthJsTestClient-Application");
        assert_eq!(config.application.application_version, "default");
        assert_eq!(config.test_user.alt_user_id, "PowerAuthJsTestClient-UserAlt");
        assert!(config.setup.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = HarnessConfig::from_toml_str(
            r#"
            [connection]
            base_url = "https://pa.example.com/powerauth-java-server"

            [setup]
            app_key = "key"
            app_secret = "secret"
            master_server_public_key = "Am/wO5SSQc4drdQ1GeaWDgqFtBppoFwygQOqK84VlMoW"
            "#,
        )
        .unwrap();
        assert_eq!(config.connection.base_url, "https://pa.example.com/powerauth-java-server");
        assert_eq!(config.connection.timeout_ms, 4000);
        assert_eq!(config.test_user, TestUserConfig::default());
        assert_eq!(config.setup.as_ref().unwrap().app_key, "key");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[connection]\ntimeout_ms = 10000").unwrap();
        let config = HarnessConfig::load_from_toml(file.path()).unwrap();
        assert_eq!(config.connection.timeout_ms, 10000);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = HarnessConfig::load_from_toml(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            HarnessConfig::from_toml_str("[connection\nbase_url = 1"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = HarnessConfig::default();
        config
            .apply_overrides(env(&[
                ("PA_BASE_URL", "http://pa:8080/server"),
                ("PA_APP_KEY", "k"),
                ("PA_APP_SECRET", "s"),
                ("PA_MASTER_PUBLIC_KEY", MASTER_KEY),
            ]))
            .unwrap();
        assert_eq!(config.connection.base_url, "http://pa:8080/server");
        let setup = config.setup.as_ref().unwrap();
        assert_eq!(setup.app_secret, "s");
        assert!(config.validate().is_ok());

        // A single override on top of an existing setup is fine.
        config.apply_overrides(env(&[("PA_APP_SECRET", "s2")])).unwrap();
        assert_eq!(config.setup.as_ref().unwrap().app_secret, "s2");
    }

    #[test]
    fn test_incomplete_setup_override_rejected() {
        let mut config = HarnessConfig::default();
        let result = config.apply_overrides(env(&[("PA_APP_KEY", "k")]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_bad_setup() {
        let mut config = HarnessConfig::default();
        config.setup = Some(ApplicationSetup {
            app_key: "k".into(),
            app_secret: "s".into(),
            master_server_public_key: "AAAA".into(),
        });
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.connection.base_url.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_setup_debug_hides_secret() {
        let setup = ApplicationSetup {
            app_key: "k".into(),
            app_secret: "very-secret".into(),
            master_server_public_key: MASTER_KEY.into(),
        };
        assert!(!format!("{setup:?}").contains("very-secret"));
    }
}
