//! # Application Configuration
//!
//! Load order: built-in defaults → TOML file → environment → CLI flags.
//!
//! The file is `--config <path>` when given (it must exist), otherwise
//! `costar.toml` in the working directory if present.

use costar_core::{BackendKind, CostarError, primitives::DEFAULT_FETCH_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file picked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "costar.toml";

/// Public TMDB API root.
pub const DEFAULT_TMDB_URL: &str = "https://api.themoviedb.org/3";

// =============================================================================
// SECTIONS
// =============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub provider: ProviderConfig,
    pub security: SecurityConfig,
}

/// HTTP listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Which graph store to open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendKind,
    pub path: PathBuf,
}

/// Metadata source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Per-fetch deadline in milliseconds.
    pub timeout_ms: u64,
    pub language: String,
    /// Parallel fetches for bulk ingestion.
    pub concurrency: usize,
}

/// HTTP surface hardening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// `*` for any origin, or a comma-separated list. Unset means localhost.
    pub cors_origins: Option<String>,
    /// Requests per second, 0 disables limiting.
    pub rate_limit: u32,
    /// Bearer key required on every route except `/health`.
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            path: PathBuf::from("costar.redb"),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_TMDB_URL.to_string(),
            api_key: None,
            timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            language: "en-US".to_string(),
            concurrency: 4,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cors_origins: None,
            rate_limit: 100,
            api_key: None,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// =============================================================================
// LOADING
// =============================================================================

/// Parse `raw` into `target`, leaving it untouched on absence or parse failure.
fn env_override<T: std::str::FromStr>(raw: Option<String>, name: &str, target: &mut T) {
    if let Some(v) = raw {
        match v.trim().parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => tracing::warn!(variable = name, value = %v, "ignoring unparsable override"),
        }
    }
}

/// Non-empty string override; an empty value clears nothing.
fn env_string(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AppConfig {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, CostarError> {
        toml::from_str(content).map_err(|e| CostarError::Serialization(format!("config: {}", e)))
    }

    /// Defaults, then the config file, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, CostarError> {
        let mut config = Self::load_file(path)?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn load_file(path: Option<&Path>) -> Result<Self, CostarError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !path.exists() {
            if required {
                return Err(CostarError::Io(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| CostarError::Io(format!("read {}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Self::from_toml(&content)
    }

    /// Apply `COSTAR_*` and `TMDB_API_KEY` overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        env_override(lookup("COSTAR_DATABASE"), "COSTAR_DATABASE", &mut self.store.path);
        env_override(lookup("COSTAR_BACKEND"), "COSTAR_BACKEND", &mut self.store.backend);
        env_override(
            lookup("COSTAR_FETCH_TIMEOUT_MS"),
            "COSTAR_FETCH_TIMEOUT_MS",
            &mut self.provider.timeout_ms,
        );
        env_override(
            lookup("COSTAR_RATE_LIMIT"),
            "COSTAR_RATE_LIMIT",
            &mut self.security.rate_limit,
        );

        if let Some(url) = env_string(lookup("COSTAR_TMDB_URL")) {
            self.provider.base_url = url;
        }
        if let Some(key) = env_string(lookup("TMDB_API_KEY")) {
            self.provider.api_key = Some(key);
        }
        if let Some(origins) = env_string(lookup("COSTAR_CORS_ORIGINS")) {
            self.security.cors_origins = Some(origins);
        }
        if let Some(key) = env_string(lookup("COSTAR_API_KEY")) {
            self.security.api_key = Some(key);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
