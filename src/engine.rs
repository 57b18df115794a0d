//! Scan decision engine
//!
//! One `evaluate` call per navigation: prune stale bypasses, honor live
//! ones, ask the classifier, apply the block policy. Every failure path
//! resolves to `Allow`; the gate must never break browsing because a
//! dependency is down.

use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::bypass::BypassStore;
use crate::classifier::Classifier;
use crate::config::GateConfig;
use crate::metrics::GateMetrics;
use crate::types::{ClassifierResult, Decision};

/// Extract the scannable hostname from a URL
///
/// Only absolute `http`/`https` URLs with a host qualify. Browser-internal
/// pages, data URIs and relative strings are not scannable.
pub fn eligible_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    match parsed.scheme() {
        "http" | "https" => parsed.host_str().map(str::to_string),
        _ => None,
    }
}

/// Apply the block policy to a classifier verdict
///
/// Risk is rounded to the nearest integer percent and compared inclusively
/// against the threshold. Labels compare lowercased against the configured
/// value; `required_label: None` disables label-gating.
fn decide(config: &GateConfig, result: &ClassifierResult) -> Decision {
    let pct = result.risk_percent.round();
    let label = result.label.to_lowercase();

    let meets_threshold = pct >= config.auto_block_threshold as f64;
    let label_matches = config
        .required_label
        .as_deref()
        .map(|required| label == required)
        .unwrap_or(true);

    if config.auto_block_enabled && meets_threshold && label_matches {
        Decision::Block
    } else {
        Decision::Allow
    }
}

/// Per-navigation scan orchestration
pub struct ScanEngine {
    bypass: Arc<BypassStore>,
    classifier: Arc<dyn Classifier>,
    config: GateConfig,
    metrics: Arc<GateMetrics>,
}

impl ScanEngine {
    /// Wire an engine over its collaborators
    pub fn new(
        bypass: Arc<BypassStore>,
        classifier: Arc<dyn Classifier>,
        config: GateConfig,
    ) -> Self {
        Self {
            bypass,
            classifier,
            config,
            metrics: Arc::new(GateMetrics::default()),
        }
    }

    /// Outcome counters shared with the gate
    pub fn metrics(&self) -> &GateMetrics {
        &self.metrics
    }

    /// Clone the counter handle, e.g. to keep reading after the gate runs
    pub fn metrics_handle(&self) -> Arc<GateMetrics> {
        self.metrics.clone()
    }

    /// The configuration this engine decides with
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Decide whether the navigation at `url` may proceed
    ///
    /// Steps run in a fixed order: eligibility, expired-bypass purge,
    /// bypass check, classify, policy. A purge failure only delays
    /// cleanup; the scan itself continues.
    pub async fn evaluate(&self, url: &str, now_ms: u64) -> Decision {
        self.metrics.record_evaluation();

        let host = match eligible_host(url) {
            Some(host) => host,
            None => {
                self.metrics.record_ineligible();
                self.metrics.record_allowed();
                debug!(url = %url, "not a scannable URL");
                return Decision::Allow;
            }
        };

        if let Err(e) = self.bypass.purge_expired(now_ms).await {
            warn!(error = %e, "bypass purge failed, continuing scan");
        }

        if self.bypass.is_active(&host, now_ms).await {
            self.metrics.record_bypass_hit();
            self.metrics.record_allowed();
            debug!(domain = %host, "bypass active, allowing");
            return Decision::Allow;
        }

        let result = match self.classifier.classify(url).await {
            Some(result) => result,
            None => {
                self.metrics.record_inconclusive();
                self.metrics.record_allowed();
                debug!(url = %url, "no classifier verdict, allowing");
                return Decision::Allow;
            }
        };

        let decision = decide(&self.config, &result);
        match decision {
            Decision::Block => {
                self.metrics.record_blocked();
                info!(
                    url = %url,
                    risk_percent = result.risk_percent,
                    label = %result.label,
                    "navigation blocked"
                );
            }
            Decision::Allow => {
                self.metrics.record_allowed();
                debug!(
                    url = %url,
                    risk_percent = result.risk_percent,
                    "below block policy, allowing"
                );
            }
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GateError, Result};
    use crate::session::{MemorySessionStore, SessionStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct ScriptedClassifier {
        result: Option<ClassifierResult>,
        calls: AtomicU64,
    }

    impl ScriptedClassifier {
        fn returning(result: Option<ClassifierResult>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: AtomicU64::new(0),
            })
        }

        fn call_count(&self) -> u64 {
            self.calls.load(Ordering::Relaxed)
        }
    }

    #[async_trait]
    impl Classifier for ScriptedClassifier {
        async fn classify(&self, _url: &str) -> Option<ClassifierResult> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.result.clone()
        }
    }

    fn verdict(risk_percent: f64, label: &str) -> ClassifierResult {
        ClassifierResult {
            risk_percent,
            label: label.to_string(),
        }
    }

    fn engine_with(classifier: Arc<ScriptedClassifier>) -> ScanEngine {
        let bypass = Arc::new(BypassStore::new(Arc::new(MemorySessionStore::default())));
        ScanEngine::new(bypass, classifier, GateConfig::default())
    }

    struct FailingStore;

    #[async_trait]
    impl SessionStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<serde_json::Value>> {
            Err(GateError::Storage("session storage offline".to_string()))
        }

        async fn set(&self, _key: &str, _value: serde_json::Value) -> Result<()> {
            Err(GateError::Storage("session storage offline".to_string()))
        }
    }

    // ─── Eligibility ─────────────────────────────────────────────────

    #[test]
    fn test_eligible_host_accepts_web_urls() {
        assert_eq!(
            eligible_host("http://example.com/login").as_deref(),
            Some("example.com")
        );
        assert_eq!(
            eligible_host("https://sub.example.com:8443/x?y=1").as_deref(),
            Some("sub.example.com")
        );
    }

    #[test]
    fn test_eligible_host_rejects_non_web() {
        assert!(eligible_host("ftp://example.com/file").is_none());
        assert!(eligible_host("chrome://settings").is_none());
        assert!(eligible_host("about:blank").is_none());
        assert!(eligible_host("data:text/html,hi").is_none());
        assert!(eligible_host("javascript:alert(1)").is_none());
    }

    #[test]
    fn test_eligible_host_rejects_relative_and_garbage() {
        assert!(eligible_host("not a url").is_none());
        assert!(eligible_host("/relative/path").is_none());
        assert!(eligible_host("").is_none());
    }

    // ─── Policy ──────────────────────────────────────────────────────

    #[test]
    fn test_threshold_is_inclusive() {
        let config = GateConfig::default();
        assert_eq!(
            decide(&config, &verdict(80.0, "phishing")),
            Decision::Block
        );
        assert_eq!(decide(&config, &verdict(79.0, "phishing")), Decision::Allow);
    }

    #[test]
    fn test_risk_rounds_to_nearest() {
        let config = GateConfig::default();
        assert_eq!(
            decide(&config, &verdict(79.5, "phishing")),
            Decision::Block
        );
        assert_eq!(
            decide(&config, &verdict(79.4, "phishing")),
            Decision::Allow
        );
    }

    #[test]
    fn test_label_mismatch_allows() {
        let config = GateConfig::default();
        assert_eq!(decide(&config, &verdict(95.0, "malware")), Decision::Allow);
    }

    #[test]
    fn test_label_compares_lowercased() {
        let config = GateConfig::default();
        assert_eq!(
            decide(&config, &verdict(90.0, "PHISHING")),
            Decision::Block
        );
    }

    #[test]
    fn test_label_gating_disabled_blocks_any_label() {
        let config = GateConfig {
            required_label: None,
            ..Default::default()
        };
        assert_eq!(decide(&config, &verdict(95.0, "malware")), Decision::Block);
    }

    #[test]
    fn test_auto_block_disabled_never_blocks() {
        let config = GateConfig {
            auto_block_enabled: false,
            ..Default::default()
        };
        assert_eq!(
            decide(&config, &verdict(100.0, "phishing")),
            Decision::Allow
        );
    }

    // ─── Evaluate pipeline ───────────────────────────────────────────

    #[tokio::test]
    async fn test_ineligible_url_never_reaches_classifier() {
        let classifier = ScriptedClassifier::returning(Some(verdict(100.0, "phishing")));
        let engine = engine_with(classifier.clone());

        let decision = engine.evaluate("chrome://settings", 1_000).await;

        assert_eq!(decision, Decision::Allow);
        assert_eq!(classifier.call_count(), 0);
        assert_eq!(engine.metrics().snapshot().ineligible, 1);
    }

    #[tokio::test]
    async fn test_high_risk_phishing_blocks() {
        let classifier = ScriptedClassifier::returning(Some(verdict(92.0, "phishing")));
        let engine = engine_with(classifier);

        let decision = engine.evaluate("http://evil.example/login", 1_000).await;

        assert_eq!(decision, Decision::Block);
        let snap = engine.metrics().snapshot();
        assert_eq!(snap.blocked, 1);
        assert_eq!(snap.allowed, 0);
    }

    #[tokio::test]
    async fn test_no_verdict_fails_open() {
        let classifier = ScriptedClassifier::returning(None);
        let engine = engine_with(classifier);

        let decision = engine.evaluate("http://unknown.example/", 1_000).await;

        assert_eq!(decision, Decision::Allow);
        assert_eq!(engine.metrics().snapshot().inconclusive, 1);
    }

    #[tokio::test]
    async fn test_active_bypass_skips_classifier() {
        let classifier = ScriptedClassifier::returning(Some(verdict(100.0, "phishing")));
        let bypass = Arc::new(BypassStore::new(Arc::new(MemorySessionStore::default())));
        bypass.grant("evil.example", 1_000, 10_000).await.unwrap();
        let engine = ScanEngine::new(bypass, classifier.clone(), GateConfig::default());

        let decision = engine.evaluate("http://evil.example/login", 1_500).await;

        assert_eq!(decision, Decision::Allow);
        assert_eq!(classifier.call_count(), 0);
        assert_eq!(engine.metrics().snapshot().bypass_hits, 1);
    }

    #[tokio::test]
    async fn test_expired_bypass_scans_again() {
        let classifier = ScriptedClassifier::returning(Some(verdict(92.0, "phishing")));
        let bypass = Arc::new(BypassStore::new(Arc::new(MemorySessionStore::default())));
        bypass.grant("evil.example", 1_000, 1_000).await.unwrap();
        let engine = ScanEngine::new(bypass, classifier.clone(), GateConfig::default());

        let decision = engine.evaluate("http://evil.example/login", 2_500).await;

        assert_eq!(decision, Decision::Block);
        assert_eq!(classifier.call_count(), 1);
    }

    #[tokio::test]
    async fn test_evaluate_purges_expired_entries() {
        let classifier = ScriptedClassifier::returning(Some(verdict(0.0, "benign")));
        let bypass = Arc::new(BypassStore::new(Arc::new(MemorySessionStore::default())));
        bypass.grant("stale.example", 0, 100).await.unwrap();
        let engine =
            ScanEngine::new(bypass.clone(), classifier, GateConfig::default());

        engine.evaluate("http://other.example/", 5_000).await;

        assert!(bypass.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bypass_for_other_domain_does_not_apply() {
        let classifier = ScriptedClassifier::returning(Some(verdict(92.0, "phishing")));
        let bypass = Arc::new(BypassStore::new(Arc::new(MemorySessionStore::default())));
        bypass.grant("safe.example", 1_000, 10_000).await.unwrap();
        let engine = ScanEngine::new(bypass, classifier, GateConfig::default());

        let decision = engine.evaluate("http://evil.example/", 1_500).await;
        assert_eq!(decision, Decision::Block);
    }

    #[tokio::test]
    async fn test_store_failure_still_scans_and_blocks() {
        // Purge and bypass lookup both fail; the verdict still decides
        let classifier = ScriptedClassifier::returning(Some(verdict(92.0, "phishing")));
        let bypass = Arc::new(BypassStore::new(Arc::new(FailingStore)));
        let engine = ScanEngine::new(bypass, classifier.clone(), GateConfig::default());

        let decision = engine.evaluate("http://evil.example/login", 1_000).await;

        assert_eq!(decision, Decision::Block);
        assert_eq!(classifier.call_count(), 1);
        assert_eq!(engine.metrics().snapshot().blocked, 1);
    }
}
