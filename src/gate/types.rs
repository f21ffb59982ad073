use serde::{Deserialize, Serialize};

// ============================================================================
// Probe payload (produced by the session provider)
// ============================================================================

/// Authentication-state tag carried by a session probe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuthState {
    #[serde(rename = "verified", alias = "authenticated_verified")]
    Verified,
    #[serde(rename = "unverified", alias = "authenticated_unverified")]
    Unverified,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionProbeResult {
    pub auth_state: Option<AuthState>,
    pub user: Option<SessionUser>,
}

impl SessionProbeResult {
    /// The tag and the user's `emailVerified` flag are equivalent confirmations;
    /// either one is enough.
    pub fn is_verified(&self) -> bool {
        if self.auth_state == Some(AuthState::Verified) {
            return true;
        }
        self.user
            .as_ref()
            .and_then(|user| user.email_verified)
            .unwrap_or(false)
    }

    pub fn to_status(&self) -> GateStatus {
        if self.is_verified() {
            GateStatus::AuthenticatedVerified
        } else {
            GateStatus::AuthenticatedUnverified
        }
    }
}

// ============================================================================
// Gate status
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    #[default]
    Unknown,
    AuthenticatedVerified,
    AuthenticatedUnverified,
    Unauthenticated,
}

impl GateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateStatus::Unknown => "unknown",
            GateStatus::AuthenticatedVerified => "authenticated_verified",
            GateStatus::AuthenticatedUnverified => "authenticated_unverified",
            GateStatus::Unauthenticated => "unauthenticated",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, GateStatus::Unknown)
    }

    /// Only a verified session lets protected children render.
    pub fn permits_render(&self) -> bool {
        matches!(self, GateStatus::AuthenticatedVerified)
    }
}

impl std::fmt::Display for GateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the render layer sees: `{ isChecking, authStatus }`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GateSnapshot {
    pub is_checking: bool,
    #[serde(rename = "authStatus")]
    pub status: GateStatus,
}

impl GateSnapshot {
    pub fn checking() -> Self {
        Self {
            is_checking: true,
            status: GateStatus::Unknown,
        }
    }

    pub fn settled(status: GateStatus) -> Self {
        Self {
            is_checking: false,
            status,
        }
    }
}

impl Default for GateSnapshot {
    fn default() -> Self {
        Self::checking()
    }
}
