//! Gate configuration
//!
//! Destination URLs and collaborator endpoints. Library types receive a
//! `GateConfig` by injection; only the host binary reads the environment.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use url::Url;

pub const DEFAULT_WEB_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const ACTIVATION_PATH: &str = "/account/activation";

pub const ENV_WEB_ORIGIN: &str = "PUBLIC_WEB_ORIGIN";
pub const ENV_API_BASE: &str = "COLLAB_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "SESSION_GATE_TIMEOUT_SECS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid URL for {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct GateConfig {
    pub web_origin: String,
    pub api_base: String,
    pub session_path: String,
    pub refresh_path: String,
    pub request_timeout_secs: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            web_origin: DEFAULT_WEB_ORIGIN.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            session_path: "/api/auth/session".to_string(),
            refresh_path: "/api/auth/refresh".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl GateConfig {
    /// Defaults overlaid with `PUBLIC_WEB_ORIGIN`, `COLLAB_API_URL` and
    /// `SESSION_GATE_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: GateConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(origin) = lookup(ENV_WEB_ORIGIN).filter(|v| !v.trim().is_empty()) {
            self.web_origin = origin;
        }
        if let Some(api) = lookup(ENV_API_BASE).filter(|v| !v.trim().is_empty()) {
            self.api_base = api;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        field: "requestTimeoutSecs",
                        value: raw.clone(),
                    })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.origin()?;
        self.api()?;
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "requestTimeoutSecs",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Login lives at the root of the web origin.
    pub fn login_url(&self) -> Result<Url, ConfigError> {
        join(self.origin()?, "/", "webOrigin")
    }

    pub fn activation_url(&self) -> Result<Url, ConfigError> {
        join(self.origin()?, ACTIVATION_PATH, "webOrigin")
    }

    pub fn session_url(&self) -> Result<Url, ConfigError> {
        join_api(self.api()?, &self.session_path, "sessionPath")
    }

    pub fn refresh_url(&self) -> Result<Url, ConfigError> {
        join_api(self.api()?, &self.refresh_path, "refreshPath")
    }

    fn origin(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.web_origin).map_err(|source| ConfigError::InvalidUrl {
            field: "webOrigin",
            source,
        })
    }

    fn api(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.api_base).map_err(|source| ConfigError::InvalidUrl {
            field: "apiBase",
            source,
        })
    }
}

fn join(base: Url, path: &str, field: &'static str) -> Result<Url, ConfigError> {
    base.join(path)
        .map_err(|source| ConfigError::InvalidUrl { field, source })
}

/// Keeps any path prefix on the API base (`https://host/v2` + `/api/x`).
fn join_api(mut base: Url, path: &str, field: &'static str) -> Result<Url, ConfigError> {
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    join(base, path.trim_start_matches('/'), field)
}
