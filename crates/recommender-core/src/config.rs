//! ============================================================================
//! Client Configuration
//! ============================================================================
//! Resolves base URL, timeout and backend choice from the environment.
//! The binary loads `.env` first; flags override whatever is resolved here.
//!
//! | Variable              | Default                           |
//! |-----------------------|-----------------------------------|
//! | RECOMMENDER_ENV       | development                       |
//! | RECOMMENDER_API_URL   | http://localhost:8000/api/v1 (dev)|
//! | RECOMMENDER_BACKEND   | http                              |
//! | RECOMMENDER_DB_PATH   | ~/.ai-recommend/preferences.redb  |
//! ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Local development backend
pub const DEV_API_URL: &str = "http://localhost:8000/api/v1";

/// Placeholder production domain that must never be dialed
pub const PLACEHOLDER_API_HOST: &str = "your-backend-domain.com";

/// Fixed request timeout (10 seconds)
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(10_000);

pub const ENV_ENVIRONMENT: &str = "RECOMMENDER_ENV";
pub const ENV_API_URL: &str = "RECOMMENDER_API_URL";
pub const ENV_BACKEND: &str = "RECOMMENDER_BACKEND";
pub const ENV_DB_PATH: &str = "RECOMMENDER_DB_PATH";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }
}

/// Which implementation sits behind the service traits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Http,
    Mock,
}

impl std::str::FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(Backend::Http),
            "mock" => Ok(Backend::Mock),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub environment: Environment,
    pub base_url: String,
    pub timeout: Duration,
    pub backend: Backend,
}

impl ClientConfig {
    /// Development defaults against the local backend
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            base_url: DEV_API_URL.to_string(),
            timeout: REQUEST_TIMEOUT,
            backend: Backend::Http,
        }
    }

    /// Build from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup(ENV_ENVIRONMENT) {
            Some(value) => value.parse()?,
            None => Environment::Development,
        };
        let backend = match lookup(ENV_BACKEND) {
            Some(value) => value.parse()?,
            None => Backend::Http,
        };
        let base_url = resolve_base_url(environment, lookup(ENV_API_URL))?;

        Ok(Self {
            environment,
            base_url,
            timeout: REQUEST_TIMEOUT,
            backend,
        })
    }

    /// Replace the base URL, applying the same checks as the environment path
    pub fn with_base_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.base_url = resolve_base_url(self.environment, Some(url.to_string()))?;
        Ok(self)
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }
}

fn resolve_base_url(environment: Environment, explicit: Option<String>) -> Result<String, ConfigError> {
    let url = match explicit.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) {
        Some(url) => url,
        None => match environment {
            Environment::Development => return Ok(DEV_API_URL.to_string()),
            Environment::Production => return Err(ConfigError::MissingProductionUrl),
        },
    };

    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::InvalidUrl(url));
    }
    if url.contains(PLACEHOLDER_API_HOST) {
        return Err(ConfigError::PlaceholderUrl(url));
    }

    Ok(url.trim_end_matches('/').to_string())
}

/// Preference database location: explicit path, then RECOMMENDER_DB_PATH,
/// then ~/.ai-recommend/preferences.redb
pub fn preferences_path(explicit: Option<&str>) -> anyhow::Result<PathBuf> {
    if let Some(p) = explicit {
        return Ok(PathBuf::from(p));
    }
    if let Ok(env_path) = std::env::var(ENV_DB_PATH) {
        return Ok(PathBuf::from(env_path));
    }
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    let dir = home.join(".ai-recommend");
    std::fs::create_dir_all(&dir)
        .map_err(|e| anyhow::anyhow!("Failed to create .ai-recommend directory: {}", e))?;
    Ok(dir.join("preferences.redb"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_development_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.base_url, DEV_API_URL);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.backend, Backend::Http);
    }

    #[test]
    fn test_production_requires_explicit_url() {
        let err = ClientConfig::from_lookup(lookup(&[(ENV_ENVIRONMENT, "production")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingProductionUrl));

        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_ENVIRONMENT, "production"),
            (ENV_API_URL, "https://api.example.co.ke/api/v1/"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://api.example.co.ke/api/v1");
    }

    #[test]
    fn test_placeholder_url_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[(
            ENV_API_URL,
            "https://your-backend-domain.com/api/v1",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::PlaceholderUrl(_)));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ClientConfig::from_lookup(lookup(&[(ENV_API_URL, "localhost:8000")])).unwrap_err(),
            ConfigError::InvalidUrl(_)
        ));
        assert!(matches!(
            ClientConfig::from_lookup(lookup(&[(ENV_ENVIRONMENT, "staging")])).unwrap_err(),
            ConfigError::UnknownEnvironment(_)
        ));
        assert!(matches!(
            ClientConfig::from_lookup(lookup(&[(ENV_BACKEND, "grpc")])).unwrap_err(),
            ConfigError::UnknownBackend(_)
        ));
    }

    #[test]
    fn test_mock_backend_selection() {
        let config = ClientConfig::from_lookup(lookup(&[(ENV_BACKEND, "MOCK")])).unwrap();
        assert_eq!(config.backend, Backend::Mock);
    }

    #[test]
    fn test_with_base_url_override() {
        let config = ClientConfig::development()
            .with_base_url("http://127.0.0.1:9000/api/v1")
            .unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:9000/api/v1");
    }
}
