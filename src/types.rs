//! Core types for the phishshield gate
//!
//! All types use camelCase JSON serialization for wire compatibility.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Opaque handle naming a browsing session (one per tab)
///
/// The host assigns these; the gate only compares and echoes them back
/// when asking the host to redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Lifecycle phase reported with a navigation event
///
/// Hosts emit `Started` when a load begins, `UrlChanged` when the
/// session's URL changes mid-load (redirects, pushState), and `Complete`
/// when the load finishes. Only the latter two carry a URL worth scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NavigationPhase {
    /// Load started; URL may still change
    Started,
    /// The session's URL changed during the load
    UrlChanged,
    /// Load finished at the current URL
    Complete,
}

/// A single navigation callback from the host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEvent {
    /// Session the navigation happened in
    pub session: SessionId,

    /// URL the session currently shows
    pub url: String,

    /// Where in the load lifecycle this event fired
    pub phase: NavigationPhase,
}

impl NavigationEvent {
    /// Convenience constructor for a completed navigation
    pub fn complete(session: SessionId, url: impl Into<String>) -> Self {
        Self {
            session,
            url: url.into(),
            phase: NavigationPhase::Complete,
        }
    }
}

/// Normalized classifier verdict for one URL
///
/// Produced by a [`crate::Classifier`] per request and discarded once the
/// block decision is made. Absent wire fields normalize to `0.0` / `""`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierResult {
    /// Risk estimate in percent, 0-100
    pub risk_percent: f64,

    /// Model label as returned by the service (e.g., "phishing", "benign")
    pub label: String,
}

/// Outcome of evaluating one navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Let the navigation proceed
    Allow,
    /// Redirect the session to the block page
    Block,
}

/// One temporary-allow grant for a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BypassEntry {
    /// Unix milliseconds after which the grant stops applying
    ///
    /// Active iff `expires_at_ms > now`; an entry expiring exactly now is
    /// already inactive.
    pub expires_at_ms: u64,
}

impl BypassEntry {
    /// Whether this grant still applies at `now_ms`
    pub fn is_active(&self, now_ms: u64) -> bool {
        self.expires_at_ms > now_ms
    }
}

/// Full persisted bypass state: one live entry per domain
///
/// A fresh grant for an existing domain overwrites the prior expiry.
pub type BypassTable = HashMap<String, BypassEntry>;

/// Inbound control message from the host UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GateMessage {
    /// Grant a temporary bypass for `domain`
    SetDomainBypass { domain: String },
}

/// Acknowledgment sent back once a bypass grant is durably applied
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BypassAck {
    /// True when the grant was persisted
    pub ok: bool,
}

/// Current time in Unix milliseconds
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
