use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::{debug, info};
use url::Url;

use super::types::{GateSnapshot, GateStatus};
use crate::config::{ConfigError, GateConfig};

pub const RETURN_URL_PARAM: &str = "returnUrl";

/// Same set `encodeURIComponent` leaves alone: alphanumerics and `-_.!~*'()`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Navigation capability injected into the gate. Production hosts perform a
/// history-replacing redirect; tests record the calls. `replace` runs under the
/// mount's liveness guard and must not unmount the gate synchronously.
pub trait Navigator: Send + Sync {
    fn current_location(&self) -> String;
    fn replace(&self, url: &Url);
}

impl<N: Navigator + ?Sized> Navigator for std::sync::Arc<N> {
    fn current_location(&self) -> String {
        (**self).current_location()
    }

    fn replace(&self, url: &Url) {
        (**self).replace(url)
    }
}

pub struct RedirectPolicy<N> {
    login_url: Url,
    activation_url: Url,
    navigator: N,
    fired_for: Option<GateStatus>,
}

impl<N: Navigator> RedirectPolicy<N> {
    pub fn new(login_url: Url, activation_url: Url, navigator: N) -> Self {
        Self {
            login_url,
            activation_url,
            navigator,
            fired_for: None,
        }
    }

    pub fn from_config(config: &GateConfig, navigator: N) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.login_url()?,
            config.activation_url()?,
            navigator,
        ))
    }

    /// Where a settled gate should send the browser, if anywhere.
    pub fn target(&self, snapshot: GateSnapshot, current_location: &str) -> Option<Url> {
        if snapshot.is_checking {
            return None;
        }
        match snapshot.status {
            GateStatus::Unknown | GateStatus::AuthenticatedVerified => None,
            GateStatus::Unauthenticated => {
                let mut url = self.login_url.clone();
                url.set_query(None);
                Some(url)
            }
            GateStatus::AuthenticatedUnverified => {
                let mut url = self.activation_url.clone();
                let encoded = utf8_percent_encode(current_location, URI_COMPONENT);
                url.set_query(Some(&format!("{}={}", RETURN_URL_PARAM, encoded)));
                Some(url)
            }
        }
    }

    /// One-shot navigation keyed on the terminal status. Re-running it for a
    /// status that already redirected does nothing.
    pub fn apply(&mut self, snapshot: GateSnapshot) -> Option<Url> {
        if snapshot.is_checking || !snapshot.status.is_terminal() {
            return None;
        }
        if self.fired_for == Some(snapshot.status) {
            debug!(status = %snapshot.status, "Redirect already issued");
            return None;
        }

        let current = self.navigator.current_location();
        let url = self.target(snapshot, &current)?;
        self.fired_for = Some(snapshot.status);

        info!(status = %snapshot.status, target = %url, "Redirecting away from protected view");
        self.navigator.replace(&url);
        Some(url)
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }
}
