//! Provider client configuration.

use crate::error::{ProviderError, ProviderResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default provider URL (can be overridden at compile time via the
/// DOORMAN_PROVIDER_URL env var).
pub const DEFAULT_PROVIDER_URL: &str = match option_env!("DOORMAN_PROVIDER_URL") {
    Some(url) => url,
    None => "https://auth.doorman.app",
};

/// Default publishable API key (can be overridden at compile time via
/// the DOORMAN_PUBLISHABLE_KEY env var).
pub const DEFAULT_PUBLISHABLE_KEY: &str = match option_env!("DOORMAN_PUBLISHABLE_KEY") {
    Some(key) => key,
    None => "doorman-publishable-key",
};

/// Identity-provider client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider project URL.
    #[serde(default = "default_provider_url")]
    pub provider_url: String,
    /// Publishable API key (public, safe to expose).
    #[serde(default = "default_publishable_key")]
    pub publishable_key: String,
}

fn default_provider_url() -> String {
    DEFAULT_PROVIDER_URL.to_string()
}

fn default_publishable_key() -> String {
    DEFAULT_PUBLISHABLE_KEY.to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_url: DEFAULT_PROVIDER_URL.to_string(),
            publishable_key: DEFAULT_PUBLISHABLE_KEY.to_string(),
        }
    }
}

impl ProviderConfig {
    /// Create a config from compile-time defaults, then override from
    /// environment variables.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from a JSON file, then override from
    /// environment variables.
    pub fn load(path: &Path) -> ProviderResult<Self> {
        let mut config = if path.exists() {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };
        config.load_from_env();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> ProviderResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ProviderError::Config(format!("read {}: {e}", path.display())))?;
        let config: ProviderConfig = serde_json::from_str(&content)
            .map_err(|e| ProviderError::Config(format!("parse {}: {e}", path.display())))?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> ProviderResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ProviderError::Config(format!("create {}: {e}", parent.display())))?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ProviderError::Config(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| ProviderError::Config(format!("write {}: {e}", path.display())))?;
        Ok(())
    }

    /// Override configuration from environment variables.
    fn load_from_env(&mut self) {
        if let Ok(url) = std::env::var("DOORMAN_PROVIDER_URL") {
            self.provider_url = url;
        }
        if let Ok(key) = std::env::var("DOORMAN_PUBLISHABLE_KEY") {
            self.publishable_key = key;
        }
    }

    /// Get the provider URL as a parsed URL.
    pub fn provider_url(&self) -> ProviderResult<Url> {
        Url::parse(&self.provider_url)
            .map_err(|e| ProviderError::Config(format!("invalid provider URL: {e}")))
    }
}
