//! Session Gate: decides whether protected views may render.
//! Kept standalone so the state machine and redirect policy can be tested in isolation.

mod component;
mod liveness;
mod machine;
mod redirect;
mod types;

pub use component::SessionGate;
pub use liveness::Liveness;
pub use machine::{drive, GateCell, GateError, GateStateMachine};
pub use redirect::{Navigator, RedirectPolicy, RETURN_URL_PARAM};
pub use types::{AuthState, GateSnapshot, GateStatus, SessionProbeResult, SessionUser};
