//! Gate outcome counters

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters for scan outcomes and bypass activity
///
/// Shared between the engine and the gate, bumped once per navigation.
/// Read via [`GateMetrics::snapshot`].
#[derive(Debug, Default)]
pub struct GateMetrics {
    evaluations: AtomicU64,
    ineligible: AtomicU64,
    bypass_hits: AtomicU64,
    inconclusive: AtomicU64,
    blocked: AtomicU64,
    allowed: AtomicU64,
    grants: AtomicU64,
    redirects: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Navigations that entered evaluation
    pub evaluations: u64,

    /// Navigations skipped as non-scannable URLs
    pub ineligible: u64,

    /// Navigations allowed by an active bypass
    pub bypass_hits: u64,

    /// Scans where no classifier endpoint answered
    pub inconclusive: u64,

    /// Block decisions
    pub blocked: u64,

    /// Allow decisions (any path)
    pub allowed: u64,

    /// Bypass grants applied
    pub grants: u64,

    /// Redirects actually issued to the host
    pub redirects: u64,
}

impl GateMetrics {
    pub(crate) fn record_evaluation(&self) {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ineligible(&self) {
        self.ineligible.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_bypass_hit(&self) {
        self.bypass_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_inconclusive(&self) {
        self.inconclusive.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_blocked(&self) {
        self.blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_allowed(&self) {
        self.allowed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_grant(&self) {
        self.grants.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_redirect(&self) {
        self.redirects.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            evaluations: self.evaluations.load(Ordering::Relaxed),
            ineligible: self.ineligible.load(Ordering::Relaxed),
            bypass_hits: self.bypass_hits.load(Ordering::Relaxed),
            inconclusive: self.inconclusive.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
            allowed: self.allowed.load(Ordering::Relaxed),
            grants: self.grants.load(Ordering::Relaxed),
            redirects: self.redirects.load(Ordering::Relaxed),
        }
    }

    /// Zero all counters
    pub fn reset(&self) {
        self.evaluations.store(0, Ordering::Relaxed);
        self.ineligible.store(0, Ordering::Relaxed);
        self.bypass_hits.store(0, Ordering::Relaxed);
        self.inconclusive.store(0, Ordering::Relaxed);
        self.blocked.store(0, Ordering::Relaxed);
        self.allowed.store(0, Ordering::Relaxed);
        self.grants.store(0, Ordering::Relaxed);
        self.redirects.store(0, Ordering::Relaxed);
    }
}
