//! Client configuration: server address and session credentials

use std::path::{Path, PathBuf};

use basable_core::{BasableError, Result};
use serde::{Deserialize, Serialize};

/// Credentials attached to every request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
    pub token: String,
    pub connection_id: String,
    /// Logged-in user (`Authorization` header) rather than a guest session (`session-id`)
    #[serde(default)]
    pub is_auth: bool,
}

/// Settings for [`HttpBackend`](crate::HttpBackend)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the Basable API, e.g. `http://127.0.0.1:5000/`
    pub base_url: String,
    pub timeout_secs: u64,
    pub credentials: Option<SessionCredentials>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000/".to_string(),
            timeout_secs: 30,
            credentials: None,
        }
    }
}

impl ClientConfig {
    /// `<config dir>/basable/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("basable").join("config.toml"))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| BasableError::Configuration(e.to_string()))
    }

    /// Load from `path` (or the default location), then apply `BASABLE_*`
    /// environment overrides. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).or_else(Self::default_path);

        let mut config = match path {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(&path).map_err(|e| {
                    BasableError::Configuration(format!("{}: {}", path.display(), e))
                })?;
                tracing::debug!(path = %path.display(), "Loaded client configuration");
                Self::from_toml_str(&contents)?
            }
            _ => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override fields from `BASABLE_BASE_URL`, `BASABLE_TOKEN`,
    /// `BASABLE_CONNECTION_ID` and `BASABLE_IS_AUTH`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("BASABLE_BASE_URL") {
            self.base_url = url;
        }

        if let Some(token) = lookup("BASABLE_TOKEN") {
            let credentials = self.credentials.get_or_insert_with(|| SessionCredentials {
                token: String::new(),
                connection_id: String::new(),
                is_auth: false,
            });
            credentials.token = token;
        }

        if let Some(connection_id) = lookup("BASABLE_CONNECTION_ID") {
            match self.credentials.as_mut() {
                Some(credentials) => credentials.connection_id = connection_id,
                None => {
                    return Err(BasableError::Configuration(
                        "BASABLE_CONNECTION_ID is set but no session token is configured".into(),
                    ));
                }
            }
        }

        if let Some(flag) = lookup("BASABLE_IS_AUTH") {
            let is_auth = matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
            if let Some(credentials) = self.credentials.as_mut() {
                credentials.is_auth = is_auth;
            }
        }

        Ok(())
    }
}
