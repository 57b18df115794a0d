//! Gate configuration

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GateError, Result};

/// Static configuration for the scan gate
///
/// All fields have defaults matching a local classifier deployment; hosts
/// typically override `endpoints` and `block_page` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GateConfig {
    /// Ordered classifier endpoints, tried first to last
    ///
    /// The defaults name the same local listener under two loopback
    /// spellings so one misresolved hostname does not take scanning down.
    pub endpoints: Vec<String>,

    /// Whether high-risk results trigger a redirect at all
    pub auto_block_enabled: bool,

    /// Risk percent at or above which a navigation is blocked (0-100)
    pub auto_block_threshold: u8,

    /// Only block when the classifier label matches (lowercased)
    ///
    /// `None` disables label-gating so any label past the threshold blocks.
    pub required_label: Option<String>,

    /// How long a bypass grant stays active, in milliseconds
    pub bypass_ttl_ms: u64,

    /// Upper bound on each classifier endpoint attempt, in milliseconds
    pub request_timeout_ms: u64,

    /// Page blocked sessions are redirected to
    ///
    /// The original URL is appended as a percent-encoded `u` query
    /// parameter. Navigations already on this page are never scanned.
    pub block_page: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![
                "http://127.0.0.1:5000/predict".to_string(),
                "http://localhost:5000/predict".to_string(),
            ],
            auto_block_enabled: true,
            auto_block_threshold: 80,
            required_label: Some("phishing".to_string()),
            bypass_ttl_ms: 30 * 60 * 1000,
            request_timeout_ms: 3_000,
            block_page: "about:blocked".to_string(),
        }
    }
}

impl GateConfig {
    /// Check field values before wiring the gate up
    ///
    /// `block_page` must parse as an absolute URL; a page that cannot be
    /// parsed would make every redirect fail at scan time.
    pub fn validate(&self) -> Result<()> {
        if self.auto_block_threshold > 100 {
            return Err(GateError::Config(format!(
                "autoBlockThreshold must be 0-100, got {}",
                self.auto_block_threshold
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(GateError::Config(
                "requestTimeoutMs must be non-zero".to_string(),
            ));
        }
        if self.block_page.is_empty() {
            return Err(GateError::Config("blockPage must be set".to_string()));
        }
        if let Err(e) = Url::parse(&self.block_page) {
            return Err(GateError::Config(format!(
                "blockPage is not a valid URL: {}",
                e
            )));
        }
        Ok(())
    }
}
