//! End-to-end gate scenarios through the public API: scripted session
//! provider, recording navigator, one mount per test.

use async_trait::async_trait;
use session_gate::gate::{AuthState, SessionProbeResult, SessionUser};
use session_gate::{
    GateConfig, GateSnapshot, GateStatus, Navigator, RedirectPolicy, SessionError, SessionGate,
    SessionProvider,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use url::Url;

const CURRENT: &str = "http://localhost:3000/tasks?board=q3 planning";

type Scripted = Result<SessionProbeResult, SessionError>;

struct ScriptedProvider {
    probes: Mutex<VecDeque<Scripted>>,
    refresh: Mutex<Option<Result<(), SessionError>>>,
    hold_probe: Option<Arc<Notify>>,
    probe_calls: Mutex<u32>,
    refresh_calls: Mutex<u32>,
}

impl ScriptedProvider {
    fn new(probes: Vec<Scripted>, refresh: Result<(), SessionError>) -> Self {
        Self {
            probes: Mutex::new(probes.into()),
            refresh: Mutex::new(Some(refresh)),
            hold_probe: None,
            probe_calls: Mutex::new(0),
            refresh_calls: Mutex::new(0),
        }
    }

    fn held_until(mut self, release: Arc<Notify>) -> Self {
        self.hold_probe = Some(release);
        self
    }

    fn probe_calls(&self) -> u32 {
        *self.probe_calls.lock().unwrap()
    }

    fn refresh_calls(&self) -> u32 {
        *self.refresh_calls.lock().unwrap()
    }
}

#[async_trait]
impl SessionProvider for ScriptedProvider {
    async fn get_current_session(&self) -> Result<SessionProbeResult, SessionError> {
        *self.probe_calls.lock().unwrap() += 1;
        if let Some(release) = &self.hold_probe {
            release.notified().await;
        }
        self.probes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SessionError::Unavailable("no scripted probe".into())))
    }

    async fn refresh_token(&self) -> Result<(), SessionError> {
        *self.refresh_calls.lock().unwrap() += 1;
        self.refresh
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(SessionError::Unavailable("refresh already used".into())))
    }
}

#[derive(Default)]
struct RecordingNavigator {
    visits: Mutex<Vec<Url>>,
}

impl RecordingNavigator {
    fn visits(&self) -> Vec<Url> {
        self.visits.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_location(&self) -> String {
        CURRENT.to_string()
    }

    fn replace(&self, url: &Url) {
        self.visits.lock().unwrap().push(url.clone());
    }
}

struct Harness {
    gate: SessionGate<&'static str>,
    provider: Arc<ScriptedProvider>,
    navigator: Arc<RecordingNavigator>,
}

fn mount(provider: ScriptedProvider) -> Harness {
    let provider = Arc::new(provider);
    let navigator = Arc::new(RecordingNavigator::default());
    let redirect = RedirectPolicy::from_config(&GateConfig::default(), navigator.clone())
        .expect("default config is valid");
    let gate = SessionGate::mount(provider.clone(), redirect, "dashboard");
    Harness {
        gate,
        provider,
        navigator,
    }
}

fn verified_tag() -> Scripted {
    Ok(SessionProbeResult {
        auth_state: Some(AuthState::Verified),
        user: None,
    })
}

fn unverified_user() -> Scripted {
    Ok(SessionProbeResult {
        auth_state: None,
        user: Some(SessionUser {
            id: Some("u-17".into()),
            email: Some("sam@example.com".into()),
            email_verified: Some(false),
        }),
    })
}

#[tokio::test]
async fn verified_probe_renders_children_without_navigation() {
    let mut h = mount(ScriptedProvider::new(vec![verified_tag()], Ok(())));

    assert_eq!(h.gate.render(), None);
    assert_eq!(h.gate.settled().await, GateStatus::AuthenticatedVerified);
    h.gate.join().await;

    assert_eq!(h.gate.render(), Some(&"dashboard"));
    assert!(h.navigator.visits().is_empty());
    assert_eq!(h.provider.refresh_calls(), 0);
}

#[tokio::test]
async fn expired_token_refreshes_then_sends_unverified_user_to_activation() {
    let mut h = mount(ScriptedProvider::new(
        vec![Err(SessionError::api(401, "token expired")), unverified_user()],
        Ok(()),
    ));

    assert_eq!(h.gate.settled().await, GateStatus::AuthenticatedUnverified);
    h.gate.join().await;

    assert_eq!(h.gate.render(), None);
    assert_eq!(h.provider.probe_calls(), 2);
    assert_eq!(h.provider.refresh_calls(), 1);

    let visits = h.navigator.visits();
    assert_eq!(visits.len(), 1);
    assert_eq!(visits[0].path(), "/account/activation");
    let pairs: Vec<(String, String)> = visits[0].query_pairs().into_owned().collect();
    assert_eq!(pairs, vec![("returnUrl".to_string(), CURRENT.to_string())]);
}

#[tokio::test]
async fn failed_refresh_sends_user_to_login() {
    let mut h = mount(ScriptedProvider::new(
        vec![Err(SessionError::api(401, "token expired")), verified_tag()],
        Err(SessionError::api(401, "refresh token revoked")),
    ));

    assert_eq!(h.gate.settled().await, GateStatus::Unauthenticated);
    h.gate.join().await;

    assert_eq!(h.provider.probe_calls(), 1);
    assert_eq!(h.provider.refresh_calls(), 1);
    let visits = h.navigator.visits();
    assert_eq!(visits.len(), 1);
    assert_eq!(visits[0].as_str(), "http://localhost:3000/");
    assert_eq!(visits[0].query(), None);
}

#[tokio::test]
async fn server_error_goes_to_login_without_refresh() {
    let mut h = mount(ScriptedProvider::new(
        vec![Err(SessionError::api(500, "internal error"))],
        Ok(()),
    ));

    assert_eq!(h.gate.settled().await, GateStatus::Unauthenticated);
    h.gate.join().await;

    assert_eq!(h.provider.refresh_calls(), 0);
    assert_eq!(
        h.navigator.visits(),
        vec![Url::parse("http://localhost:3000/").unwrap()]
    );
}

#[tokio::test]
async fn unmount_before_probe_settles_discards_result() {
    let release = Arc::new(Notify::new());
    let h = mount(
        ScriptedProvider::new(vec![unverified_user()], Ok(())).held_until(release.clone()),
    );
    let state = h.gate.subscribe();

    // Let the spawned sequence reach the held probe.
    while h.provider.probe_calls() == 0 {
        tokio::task::yield_now().await;
    }

    let task = h.gate.unmount().expect("task handle on first unmount");
    release.notify_one();
    task.await.expect("gate task completes");

    assert_eq!(*state.borrow(), GateSnapshot::checking());
    assert!(h.navigator.visits().is_empty());
}

#[tokio::test]
async fn dropping_gate_also_stops_state_updates() {
    let release = Arc::new(Notify::new());
    let h = mount(ScriptedProvider::new(vec![verified_tag()], Ok(())).held_until(release.clone()));
    let mut state = h.gate.subscribe();
    let navigator = h.navigator.clone();
    drop(h);

    release.notify_one();
    // The sender closes without ever publishing a terminal status.
    assert!(state.changed().await.is_err());
    assert_eq!(*state.borrow(), GateSnapshot::checking());
    assert!(navigator.visits().is_empty());
}
