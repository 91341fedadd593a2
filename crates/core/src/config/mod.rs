//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWORKER_*)
//! 2. TOML config file (if SWORKER_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::worker::{CacheNames, Generation, Manifest, Scope};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWORKER_*)
/// 2. TOML config file (if SWORKER_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name used as the cache store prefix.
    ///
    /// Set via SWORKER_APP_NAME environment variable.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Deployment generation tag. Bumping it orphans every older store.
    ///
    /// Set via SWORKER_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin of the controlled application.
    ///
    /// Set via SWORKER_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Absolute paths precached into the static store on install.
    ///
    /// Set via SWORKER_PRECACHE environment variable.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Same-origin path prefixes served cache-first from the static store.
    ///
    /// Set via SWORKER_STATIC_PREFIXES environment variable.
    #[serde(default = "default_static_prefixes")]
    pub static_prefixes: Vec<String>,

    /// Page returned for HTML requests that fail while offline.
    ///
    /// Set via SWORKER_OFFLINE_PAGE environment variable.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Activate a freshly installed worker without waiting for sessions to close.
    ///
    /// Set via SWORKER_SKIP_WAITING environment variable.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Path to SQLite cache database.
    ///
    /// Set via SWORKER_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SWORKER_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SWORKER_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via SWORKER_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Maximum number of redirects to follow.
    ///
    /// Set via SWORKER_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_app_name() -> String {
    "akili".into()
}

fn default_cache_version() -> String {
    "v2".into()
}

fn default_origin() -> String {
    "http://127.0.0.1:8000".into()
}

fn default_precache() -> Vec<String> {
    vec![
        "/".into(),
        "/static/css/custom.css".into(),
        "/static/js/main.js".into(),
        "/static/images/logo.png".into(),
    ]
}

fn default_static_prefixes() -> Vec<String> {
    vec!["/static/".into()]
}

fn default_offline_page() -> String {
    "/".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./sworker-cache.sqlite")
}

fn default_user_agent() -> String {
    "sworker/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_max_redirects() -> usize {
    5
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            cache_version: default_cache_version(),
            origin: default_origin(),
            precache: default_precache(),
            static_prefixes: default_static_prefixes(),
            offline_page: default_offline_page(),
            skip_waiting: true,
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed origin URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an http(s) URL with a host.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;

        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ConfigError::Invalid { field: "origin".into(), reason: "must be an http(s) URL with a host".into() });
        }

        Ok(url)
    }

    /// Store names for the configured generation.
    pub fn cache_names(&self) -> CacheNames {
        CacheNames::new(&self.app_name, &self.cache_version)
    }

    /// Scope used to classify requests as static assets.
    pub fn scope(&self) -> Result<Scope, ConfigError> {
        Ok(Scope::new(self.origin_url()?, self.static_prefixes.clone()))
    }

    /// Manifest resolved against the configured origin.
    pub fn manifest(&self) -> Result<Manifest, ConfigError> {
        let origin = self.origin_url()?;
        Manifest::resolve(&origin, self.precache.as_slice())
            .map_err(|e| ConfigError::Invalid { field: "precache".into(), reason: e.to_string() })
    }

    /// Absolute URL of the offline fallback page.
    pub fn offline_page_url(&self) -> Result<Url, ConfigError> {
        self.origin_url()?
            .join(&self.offline_page)
            .map_err(|e| ConfigError::Invalid { field: "offline_page".into(), reason: e.to_string() })
    }

    /// Generation described by this config, optionally under another version tag.
    pub fn generation(&self, version: Option<&str>) -> Result<Generation, ConfigError> {
        let names = match version {
            Some(v) if !validation::is_token(v) => {
                return Err(ConfigError::Invalid {
                    field: "cache_version".into(),
                    reason: "must be non-empty without whitespace".into(),
                });
            }
            Some(v) => CacheNames::new(&self.app_name, v),
            None => self.cache_names(),
        };
        Ok(Generation {
            names,
            manifest: self.manifest()?,
            scope: self.scope()?,
            offline_page: self.offline_page_url()?,
        })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWORKER_`
    /// 2. TOML file from `SWORKER_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWORKER_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWORKER_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.app_name, "akili");
        assert_eq!(config.cache_version, "v2");
        assert_eq!(config.precache.len(), 4);
        assert_eq!(config.precache[0], "/");
        assert_eq!(config.static_prefixes, vec!["/static/".to_string()]);
        assert_eq!(config.offline_page, "/");
        assert!(config.skip_waiting);
        assert_eq!(config.db_path, PathBuf::from("./sworker-cache.sqlite"));
        assert_eq!(config.user_agent, "sworker/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_cache_names_follow_generation() {
        let config = AppConfig { cache_version: "v3".into(), ..Default::default() };
        let names = config.cache_names();
        assert_eq!(names.static_name(), "akili-static-v3");
        assert_eq!(names.dynamic_name(), "akili-dynamic-v3");
    }

    #[test]
    fn test_manifest_resolves_against_origin() {
        let config = AppConfig { origin: "https://learn.example.org".into(), ..Default::default() };
        let manifest = config.manifest().unwrap();
        let urls: Vec<&str> = manifest.urls().iter().map(Url::as_str).collect();
        assert_eq!(urls[0], "https://learn.example.org/");
        assert_eq!(urls[1], "https://learn.example.org/static/css/custom.css");
    }

    #[test]
    fn test_offline_page_url() {
        let config = AppConfig::default();
        assert_eq!(config.offline_page_url().unwrap().as_str(), "http://127.0.0.1:8000/");
    }

    #[test]
    fn test_generation_version_override() {
        let config = AppConfig::default();
        let current = config.generation(None).unwrap();
        assert_eq!(current.names.static_name(), "akili-static-v2");

        let next = config.generation(Some("v3")).unwrap();
        assert_eq!(next.names.dynamic_name(), "akili-dynamic-v3");
        assert_eq!(next.manifest, current.manifest);

        assert!(config.generation(Some("v 3")).is_err());
        assert!(config.generation(Some("")).is_err());
    }

    #[test]
    fn test_origin_rejects_other_schemes() {
        let config = AppConfig { origin: "ftp://example.com".into(), ..Default::default() };
        assert!(matches!(config.origin_url(), Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }
}
