// pubdisk Configuration Module
// Persistent client configuration with environment overrides

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

use crate::browser::{
    yandex, BackendListingClient, BrowserError, HttpRetryConfig, ListingClient, PublicKey,
    YandexPublicClient,
};

pub const ENV_BACKEND_URL: &str = "PUBDISK_BACKEND_URL";
pub const ENV_YANDEX_API_URL: &str = "YANDEX_API_BASE_URL";
pub const ENV_LISTING_SOURCE: &str = "PUBDISK_LISTING_SOURCE";
pub const ENV_PUBLIC_KEY: &str = "PUBDISK_PUBLIC_KEY";

/// Where folder listings come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingSource {
    /// The proxy backend's `get_files/` endpoint
    #[default]
    Backend,
    /// The public-resources API, bypassing the backend
    Direct,
}

impl FromStr for ListingSource {
    type Err = BrowserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "backend" => Ok(ListingSource::Backend),
            "direct" | "yandex" => Ok(ListingSource::Direct),
            other => Err(BrowserError::InvalidConfig(format!("Unknown listing source '{}'", other))),
        }
    }
}

impl fmt::Display for ListingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingSource::Backend => write!(f, "backend"),
            ListingSource::Direct => write!(f, "direct"),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Base URL of the proxy backend serving listings and downloads
    pub backend_url: String,
    /// Public-resources API endpoint used by the direct listing source
    pub yandex_api_url: String,
    pub listing_source: ListingSource,
    /// HTTP timeout for listing requests
    pub timeout_secs: u64,
    pub retry: HttpRetryConfig,
    /// Default public key when none is given on the command line
    pub public_key: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8000/".to_string(),
            yandex_api_url: yandex::DEFAULT_API_URL.to_string(),
            listing_source: ListingSource::default(),
            timeout_secs: 30,
            retry: HttpRetryConfig::default(),
            public_key: None,
        }
    }
}

impl BrowserConfig {
    /// Apply overrides from a variable lookup. Unparseable values are skipped with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BACKEND_URL) {
            self.backend_url = url;
        }
        if let Some(url) = lookup(ENV_YANDEX_API_URL) {
            self.yandex_api_url = url;
        }
        if let Some(source) = lookup(ENV_LISTING_SOURCE) {
            match source.parse() {
                Ok(source) => self.listing_source = source,
                Err(e) => tracing::warn!("Ignoring {}: {}", ENV_LISTING_SOURCE, e),
            }
        }
        if let Some(key) = lookup(ENV_PUBLIC_KEY).filter(|k| !k.trim().is_empty()) {
            self.public_key = Some(key);
        }
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    pub fn backend_base_url(&self) -> Result<Url, BrowserError> {
        parse_http_url("backend_url", &self.backend_url)
    }

    pub fn yandex_api_base_url(&self) -> Result<Url, BrowserError> {
        parse_http_url("yandex_api_url", &self.yandex_api_url)
    }

    pub fn default_public_key(&self) -> PublicKey {
        PublicKey::new(self.public_key.clone().unwrap_or_default())
    }

    /// Create the listing client selected by `listing_source`
    pub fn listing_client(&self) -> Result<Box<dyn ListingClient>, BrowserError> {
        match self.listing_source {
            ListingSource::Backend => Ok(Box::new(BackendListingClient::new(
                self.backend_base_url()?,
                self.timeout_secs,
                self.retry.clone(),
            ))),
            ListingSource::Direct => Ok(Box::new(YandexPublicClient::new(
                self.yandex_api_base_url()?,
                self.timeout_secs,
                self.retry.clone(),
            ))),
        }
    }
}

fn parse_http_url(field: &str, raw: &str) -> Result<Url, BrowserError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| BrowserError::InvalidConfig(format!("{} '{}': {}", field, raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(BrowserError::InvalidConfig(format!(
            "{} must use http or https, got '{}'",
            field,
            url.scheme()
        )));
    }
    Ok(url)
}

/// Validate configuration
pub fn validate_config(config: &BrowserConfig) -> Result<(), BrowserError> {
    config.backend_base_url()?;
    config.yandex_api_base_url()?;

    if config.timeout_secs == 0 {
        return Err(BrowserError::InvalidConfig("timeout_secs must be greater than zero".to_string()));
    }

    if config.retry.backoff_multiplier < 1.0 {
        return Err(BrowserError::InvalidConfig("retry.backoff_multiplier must be at least 1.0".to_string()));
    }

    Ok(())
}

/// Get the path to the config file
pub fn get_config_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")));
    config_dir.join("pubdisk").join("config.json")
}

/// Load configuration from `path`, falling back to defaults
pub fn load_config_from(path: &Path) -> BrowserConfig {
    if path.exists() {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to parse config {:?}: {}", path, e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config {:?}: {}", path, e);
            }
        }
    }

    BrowserConfig::default()
}

/// Load configuration from the default location and apply environment overrides
pub fn load_config() -> BrowserConfig {
    let mut config = load_config_from(&get_config_path());
    config.apply_env();
    config
}

/// Save configuration to `path`
pub fn save_config_to(config: &BrowserConfig, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    fs::write(path, content)
        .map_err(|e| format!("Failed to write config: {}", e))?;

    tracing::info!("Config saved to {:?}", path);
    Ok(())
}

pub fn save_config(config: &BrowserConfig) -> Result<(), String> {
    save_config_to(config, &get_config_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = BrowserConfig::default();
        assert_eq!(config.listing_source, ListingSource::Backend);
        assert_eq!(config.timeout_secs, 30);
        assert!(validate_config(&config).is_ok());
        assert!(config.default_public_key().is_empty());
    }

    #[test]
    fn test_validate_config() {
        let mut config = BrowserConfig {
            backend_url: "ftp://example.org/".to_string(),
            ..Default::default()
        };
        assert!(matches!(validate_config(&config), Err(BrowserError::InvalidConfig(_))));

        config.backend_url = "not a url".to_string();
        assert!(validate_config(&config).is_err());

        config.backend_url = "https://example.org/".to_string();
        config.timeout_secs = 0;
        assert!(validate_config(&config).is_err());

        config.timeout_secs = 10;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_BACKEND_URL, "https://proxy.example.org/"),
            (ENV_LISTING_SOURCE, "direct"),
            (ENV_PUBLIC_KEY, "https://yadi.sk/d/xyz"),
        ]
        .into_iter()
        .collect();

        let mut config = BrowserConfig::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.backend_url, "https://proxy.example.org/");
        assert_eq!(config.listing_source, ListingSource::Direct);
        assert_eq!(config.default_public_key().as_str(), "https://yadi.sk/d/xyz");
        assert_eq!(config.yandex_api_url, yandex::DEFAULT_API_URL);
    }

    #[test]
    fn test_bad_listing_source_override_is_ignored() {
        let mut config = BrowserConfig::default();
        config.apply_overrides(|name| (name == ENV_LISTING_SOURCE).then(|| "ftp".to_string()));
        assert_eq!(config.listing_source, ListingSource::Backend);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = BrowserConfig {
            listing_source: ListingSource::Direct,
            public_key: Some("key".to_string()),
            ..Default::default()
        };
        save_config_to(&config, &path).unwrap();
        assert_eq!(load_config_from(&path), config);
    }

    #[test]
    fn test_partial_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        fs::write(&path, r#"{"timeout_secs": 5}"#).unwrap();
        let config = load_config_from(&path);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.backend_url, BrowserConfig::default().backend_url);

        fs::write(&path, "{not json").unwrap();
        assert_eq!(load_config_from(&path), BrowserConfig::default());

        assert_eq!(load_config_from(&dir.path().join("missing.json")), BrowserConfig::default());
    }

    #[test]
    fn test_listing_client_factory() {
        let mut config = BrowserConfig::default();
        assert!(config.listing_client().unwrap().display_name().starts_with("backend"));

        config.listing_source = ListingSource::Direct;
        assert_eq!(config.listing_client().unwrap().display_name(), "Yandex Disk");

        config.yandex_api_url = "mailto:someone".to_string();
        assert!(config.listing_client().is_err());
    }
}
