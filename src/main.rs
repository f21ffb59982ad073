//! Session Gate - host entry point
//!
//! Mounts the gate once in front of a placeholder dashboard, the way the
//! application's top-level route wrapper does:
//! - Configuration from an optional JSON file plus environment overrides
//! - HTTP session provider against the collaboration API
//! - Console navigator that prints the redirect destination

use session_gate::{
    GateConfig, GateStatus, HttpSessionProvider, Navigator, RedirectPolicy, SessionGate,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use url::Url;

const ENV_LOCATION: &str = "SESSION_GATE_LOCATION";

/// Prints the destination instead of driving a browser history stack.
struct ConsoleNavigator {
    location: String,
}

impl Navigator for ConsoleNavigator {
    fn current_location(&self) -> String {
        self.location.clone()
    }

    fn replace(&self, url: &Url) {
        info!("location.replace({})", url);
        println!("redirect {}", url);
    }
}

fn load_config() -> Result<GateConfig, session_gate::ConfigError> {
    match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => {
            info!("Loading gate config from {}", path.display());
            GateConfig::from_json_file(&path)?
                .with_overrides(|key| std::env::var(key).ok())
        }
        None => GateConfig::from_env(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // ---------- Log directory setup ----------
    let log_dir = std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".session-gate")
        .join("logs");
    let _ = std::fs::create_dir_all(&log_dir);

    // Daily-rotated file appender: gate.log.YYYY-MM-DD
    let file_appender = tracing_appender::rolling::daily(&log_dir, "gate.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("session_gate=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid gate configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Web origin: {}, API: {}", config.web_origin, config.api_base);

    let provider = match HttpSessionProvider::new(&config) {
        Ok(provider) => provider,
        Err(e) => {
            error!("Failed to build session provider: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let location = std::env::var(ENV_LOCATION).unwrap_or_else(|_| config.web_origin.clone());
    let redirect = match RedirectPolicy::from_config(&config, ConsoleNavigator { location }) {
        Ok(redirect) => redirect,
        Err(e) => {
            error!("Invalid redirect destinations: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut gate = SessionGate::mount(provider, redirect, "dashboard");
    let status = gate.settled().await;

    if let Some(view) = gate.render() {
        println!("render {}", view);
    }

    gate.join().await;

    match status {
        GateStatus::AuthenticatedVerified => ExitCode::SUCCESS,
        _ => ExitCode::from(2),
    }
}
