//! Configuration Management
//!
//! Persistent defaults for cscli plus the per-invocation client configuration
//! resolved from flags, environment and the persisted file.

use crate::error::CliError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

pub const ENV_USERNAME: &str = "CLOUDSIGMA_USERNAME";
pub const ENV_PASSWORD: &str = "CLOUDSIGMA_PASSWORD";
pub const ENV_REGION: &str = "CLOUDSIGMA_REGION";
pub const ENV_API_ENDPOINT: &str = "CLOUDSIGMA_API_ENDPOINT";

/// User configuration persisted between invocations
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default region
    #[serde(default)]
    pub region: Option<String>,
    /// Default username
    #[serde(default)]
    pub username: Option<String>,
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            return Some(config_dir.join("cscli").join("config.json"));
        }
        dirs::home_dir().map(|home| home.join(".cscli").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path().ok_or_else(|| anyhow::anyhow!("No config directory"))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        #[cfg(unix)]
        {
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&path, permissions)?;
        }

        Ok(path)
    }
}

/// Values given explicitly on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub region: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub endpoint: Option<String>,
}

/// Everything the client needs to reach one region, built once per invocation
#[derive(Clone)]
pub struct ClientConfig {
    pub region: String,
    pub username: String,
    pub password: String,
    pub api_endpoint: String,
    pub upload_endpoint: String,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("region", &self.region)
            .field("username", &self.username)
            .field("password", &"********")
            .field("api_endpoint", &self.api_endpoint)
            .field("upload_endpoint", &self.upload_endpoint)
            .finish()
    }
}

impl ClientConfig {
    /// Build a configuration for a region with the standard endpoints
    pub fn new(region: &str, username: &str, password: &str) -> Self {
        Self {
            region: region.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            api_endpoint: format!("https://{}.cloudsigma.com/api/2.0/", region),
            upload_endpoint: format!(
                "https://direct.{}.cloudsigma.com/api/2.0/drives/upload/",
                region
            ),
        }
    }

    /// Point the API at a different base URL
    pub fn with_api_endpoint(mut self, endpoint: &str) -> Self {
        self.api_endpoint = if endpoint.ends_with('/') {
            endpoint.to_string()
        } else {
            format!("{}/", endpoint)
        };
        self
    }

    /// Send drive uploads to a different URL
    pub fn with_upload_endpoint(mut self, endpoint: &str) -> Self {
        self.upload_endpoint = endpoint.to_string();
        self
    }

    /// Resolve flags > environment > persisted config
    pub fn resolve(overrides: &Overrides, config: &Config) -> Result<Self> {
        Self::resolve_with(overrides, config, |key| std::env::var(key).ok())
    }

    fn resolve_with<F>(overrides: &Overrides, config: &Config, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |flag: &Option<String>, key: &str, saved: &Option<String>| {
            flag.clone()
                .or_else(|| env(key))
                .or_else(|| saved.clone())
                .filter(|v| !v.is_empty())
        };

        let region = pick(&overrides.region, ENV_REGION, &config.region)
            .ok_or_else(|| CliError::parameter(format!("missing region; set {}", ENV_REGION)))?;
        let username = pick(&overrides.username, ENV_USERNAME, &config.username)
            .ok_or_else(|| CliError::parameter(format!("missing username; set {}", ENV_USERNAME)))?;
        let password = pick(&overrides.password, ENV_PASSWORD, &None)
            .ok_or_else(|| CliError::parameter(format!("missing password; set {}", ENV_PASSWORD)))?;

        let mut resolved = Self::new(&region, &username, &password);
        if let Some(endpoint) = pick(&overrides.endpoint, ENV_API_ENDPOINT, &None) {
            resolved = resolved.with_api_endpoint(&endpoint);
        }

        tracing::debug!("Resolved client config: {:?}", resolved);
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_endpoints_derive_from_region() {
        let config = ClientConfig::new("zrh", "me@example.com", "secret");
        assert_eq!(config.api_endpoint, "https://zrh.cloudsigma.com/api/2.0/");
        assert_eq!(
            config.upload_endpoint,
            "https://direct.zrh.cloudsigma.com/api/2.0/drives/upload/"
        );
    }

    #[test]
    fn test_flags_take_precedence_over_environment() {
        let overrides = Overrides {
            region: Some("sjc".to_string()),
            ..Default::default()
        };
        let env = env_of(&[
            (ENV_REGION, "zrh"),
            (ENV_USERNAME, "env-user"),
            (ENV_PASSWORD, "env-pass"),
        ]);

        let config = ClientConfig::resolve_with(&overrides, &Config::default(), env).unwrap();
        assert_eq!(config.region, "sjc");
        assert_eq!(config.username, "env-user");
        assert_eq!(config.password, "env-pass");
    }

    #[test]
    fn test_saved_config_fills_region_and_username() {
        let saved = Config {
            region: Some("wdc".to_string()),
            username: Some("saved-user".to_string()),
        };
        let env = env_of(&[(ENV_PASSWORD, "pw")]);

        let config = ClientConfig::resolve_with(&Overrides::default(), &saved, env).unwrap();
        assert_eq!(config.region, "wdc");
        assert_eq!(config.username, "saved-user");
    }

    #[test]
    fn test_missing_password_is_a_parameter_error() {
        let env = env_of(&[(ENV_REGION, "zrh"), (ENV_USERNAME, "user")]);
        let err = ClientConfig::resolve_with(&Overrides::default(), &Config::default(), env)
            .unwrap_err();
        assert!(err.to_string().contains(ENV_PASSWORD));
    }

    #[test]
    fn test_endpoint_override_gets_trailing_slash() {
        let overrides = Overrides {
            endpoint: Some("http://127.0.0.1:9000/api/2.0".to_string()),
            ..Default::default()
        };
        let env = env_of(&[
            (ENV_REGION, "zrh"),
            (ENV_USERNAME, "user"),
            (ENV_PASSWORD, "pw"),
        ]);

        let config = ClientConfig::resolve_with(&overrides, &Config::default(), env).unwrap();
        assert_eq!(config.api_endpoint, "http://127.0.0.1:9000/api/2.0/");
    }

    #[test]
    fn test_debug_masks_password() {
        let config = ClientConfig::new("zrh", "user", "hunter2");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
    }
}
