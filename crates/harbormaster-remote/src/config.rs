use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_TOTAL_TIMEOUT_SECS: u64 = 10;
pub const DOCKER_HUB_AUTH_URL: &str = "https://auth.docker.io/token";
pub const GHCR_AUTH_URL: &str = "https://ghcr.io/token";

/// Host serving the v2 API for references normalized to `docker.io`.
const DOCKER_HUB_ENDPOINT: &str = "https://registry-1.docker.io";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid registry config: {0}")]
    Invalid(String),
    #[error("HOME not set")]
    NoHome,
}

/// Registry client settings, stored as JSON at `~/.config/harbormaster/registry.json`.
///
/// Every field is optional in the file; missing ones take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Bearer token sent to ghcr.io instead of requesting an anonymous one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ghcr_token: Option<String>,
    #[serde(default = "default_docker_hub_auth_url")]
    pub docker_hub_auth_url: String,
    #[serde(default = "default_ghcr_auth_url")]
    pub ghcr_auth_url: String,
    /// Registry host → base URL of its v2 API (e.g. a pull-through mirror).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub endpoints: BTreeMap<String, String>,
    /// Hosts reached over plain HTTP.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insecure_registries: Vec<String>,
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_total_timeout() -> u64 {
    DEFAULT_TOTAL_TIMEOUT_SECS
}

fn default_docker_hub_auth_url() -> String {
    DOCKER_HUB_AUTH_URL.to_owned()
}

fn default_ghcr_auth_url() -> String {
    GHCR_AUTH_URL.to_owned()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            total_timeout_secs: DEFAULT_TOTAL_TIMEOUT_SECS,
            ghcr_token: None,
            docker_hub_auth_url: default_docker_hub_auth_url(),
            ghcr_auth_url: default_ghcr_auth_url(),
            endpoints: BTreeMap::new(),
            insecure_registries: Vec::new(),
        }
    }
}

impl RegistryConfig {
    #[must_use]
    pub fn with_ghcr_token(mut self, token: &str) -> Self {
        self.ghcr_token = Some(token.to_owned());
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, registry: &str, base_url: &str) -> Self {
        self.endpoints.insert(
            registry.to_owned(),
            base_url.trim_end_matches('/').to_owned(),
        );
        self
    }

    /// Load `~/.config/harbormaster/registry.json`, falling back to defaults when
    /// the file does not exist, then fill the GHCR token from the environment.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path()?;
        let config = if path.exists() {
            Self::load(&path)?
        } else {
            Self::default()
        };
        Ok(config.with_env_token(|name| std::env::var(name).ok()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| ConfigError::Invalid(format!("{}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Take `GHCR_TOKEN`, then `GITHUB_TOKEN`, unless a token is already configured.
    #[must_use]
    pub fn with_env_token(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if self.ghcr_token.is_none() {
            self.ghcr_token = ["GHCR_TOKEN", "GITHUB_TOKEN"]
                .into_iter()
                .filter_map(&lookup)
                .find(|token| !token.is_empty());
        }
        self
    }

    /// Base URL of the v2 API for `registry`, without a trailing slash.
    pub fn endpoint_for(&self, registry: &str) -> String {
        if let Some(url) = self.endpoints.get(registry) {
            return url.trim_end_matches('/').to_owned();
        }
        if registry == harbormaster_schema::DEFAULT_REGISTRY {
            return DOCKER_HUB_ENDPOINT.to_owned();
        }
        if self.insecure_registries.iter().any(|r| r == registry) {
            format!("http://{registry}")
        } else {
            format!("https://{registry}")
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn total_timeout(&self) -> Duration {
        Duration::from_secs(self.total_timeout_secs)
    }
}

/// `~/.config/harbormaster/registry.json`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoHome)?;
    Ok(PathBuf::from(home).join(".config/harbormaster/registry.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/registry.json");

        let config = RegistryConfig::default()
            .with_ghcr_token("ghp_secret")
            .with_endpoint("docker.io", "https://mirror.example.com/");
        config.save(&path).unwrap();

        let loaded = RegistryConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.endpoints["docker.io"], "https://mirror.example.com");
    }

    #[test]
    fn partial_file_takes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(&path, r#"{"total_timeout_secs": 30}"#).unwrap();

        let loaded = RegistryConfig::load(&path).unwrap();
        assert_eq!(loaded.total_timeout(), Duration::from_secs(30));
        assert_eq!(loaded.connect_timeout(), Duration::from_secs(5));
        assert_eq!(loaded.docker_hub_auth_url, DOCKER_HUB_AUTH_URL);
        assert!(loaded.ghcr_token.is_none());
    }

    #[test]
    fn invalid_json_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            RegistryConfig::load(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn endpoints_resolve_per_registry() {
        let config = RegistryConfig {
            insecure_registries: vec!["localhost:5000".to_owned()],
            ..RegistryConfig::default()
        };
        assert_eq!(config.endpoint_for("docker.io"), "https://registry-1.docker.io");
        assert_eq!(config.endpoint_for("ghcr.io"), "https://ghcr.io");
        assert_eq!(config.endpoint_for("localhost:5000"), "http://localhost:5000");

        let mirrored = config.with_endpoint("docker.io", "http://127.0.0.1:9000");
        assert_eq!(mirrored.endpoint_for("docker.io"), "http://127.0.0.1:9000");
    }

    #[test]
    fn env_token_prefers_ghcr_token() {
        let config = RegistryConfig::default().with_env_token(|name| match name {
            "GHCR_TOKEN" => Some("from-ghcr".to_owned()),
            "GITHUB_TOKEN" => Some("from-github".to_owned()),
            _ => None,
        });
        assert_eq!(config.ghcr_token.as_deref(), Some("from-ghcr"));
    }

    #[test]
    fn env_token_falls_back_to_github_token() {
        let config = RegistryConfig::default().with_env_token(|name| match name {
            "GHCR_TOKEN" => Some(String::new()),
            "GITHUB_TOKEN" => Some("from-github".to_owned()),
            _ => None,
        });
        assert_eq!(config.ghcr_token.as_deref(), Some("from-github"));
    }

    #[test]
    fn configured_token_is_not_overridden() {
        let config = RegistryConfig::default()
            .with_ghcr_token("configured")
            .with_env_token(|_| Some("env".to_owned()));
        assert_eq!(config.ghcr_token.as_deref(), Some("configured"));
    }
}
