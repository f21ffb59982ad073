//! Session Provider seam
//!
//! The gate consumes two collaborator calls: fetch the current session and
//! attempt a refresh. `HttpSessionProvider` talks to the collaboration API;
//! tests and embedders can supply their own implementation.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::GateConfig;
use crate::gate::SessionProbeResult;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed session payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Session provider unavailable: {0}")]
    Unavailable(String),
}

impl SessionError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        SessionError::Api {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            SessionError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Only API-level 401/403 responses earn a refresh-and-retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn get_current_session(&self) -> Result<SessionProbeResult, SessionError>;
    async fn refresh_token(&self) -> Result<(), SessionError>;
}

#[async_trait]
impl<P: SessionProvider + ?Sized> SessionProvider for Arc<P> {
    async fn get_current_session(&self) -> Result<SessionProbeResult, SessionError> {
        (**self).get_current_session().await
    }

    async fn refresh_token(&self) -> Result<(), SessionError> {
        (**self).refresh_token().await
    }
}

// ============================================================================
// HTTP Provider
// ============================================================================

pub struct HttpSessionProvider {
    client: reqwest::Client,
    session_url: Url,
    refresh_url: Url,
}

impl HttpSessionProvider {
    pub fn new(config: &GateConfig) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .cookie_store(true)
            .build()?;

        let session_url = config
            .session_url()
            .map_err(|e| SessionError::Unavailable(e.to_string()))?;
        let refresh_url = config
            .refresh_url()
            .map_err(|e| SessionError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            session_url,
            refresh_url,
        })
    }

    pub fn session_url(&self) -> &Url {
        &self.session_url
    }

    pub fn refresh_url(&self) -> &Url {
        &self.refresh_url
    }
}

async fn ensure_success(res: reqwest::Response) -> Result<reqwest::Response, SessionError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let message = res
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(SessionError::api(status.as_u16(), message))
}

#[async_trait]
impl SessionProvider for HttpSessionProvider {
    async fn get_current_session(&self) -> Result<SessionProbeResult, SessionError> {
        debug!("GET {}", self.session_url);
        let res = self
            .client
            .get(self.session_url.clone())
            .header("accept", "application/json")
            .send()
            .await?;
        let body = ensure_success(res).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn refresh_token(&self) -> Result<(), SessionError> {
        debug!("POST {}", self.refresh_url);
        let res = self.client.post(self.refresh_url.clone()).send().await?;
        ensure_success(res).await?;
        Ok(())
    }
}
