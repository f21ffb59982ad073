//! Session Gate Library
//!
//! Authentication gate for the collaboration dashboard: probes the current
//! session, recovers once from an expired token, and either renders the
//! protected view or redirects to login or account activation.

pub mod config;
pub mod gate;
pub mod session;

pub use config::{ConfigError, GateConfig};
pub use gate::{GateSnapshot, GateStatus, Navigator, RedirectPolicy, SessionGate};
pub use session::{HttpSessionProvider, SessionError, SessionProvider};
