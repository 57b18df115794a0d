//! Async HTTP client for the URL risk classifier
//!
//! Talks to an ordered list of capability-equivalent endpoints; the first
//! one to answer wins. A scan that no endpoint can answer yields no result
//! rather than an error, so navigation never stalls on classifier outages.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::GateConfig;
use crate::error::{GateError, Result};
use crate::types::ClassifierResult;

/// Trait for URL risk classification
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify `url`; `None` means no endpoint produced a verdict
    async fn classify(&self, url: &str) -> Option<ClassifierResult>;
}

/// Request body sent to each endpoint
#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    url: &'a str,
}

/// Raw response body from a classifier endpoint
///
/// Deployed models spell the risk field either `risk_percent` or `pct`;
/// `risk_percent` wins when both are present. Absent fields normalize to
/// `0.0` / `""`.
#[derive(Debug, Deserialize)]
struct PredictResponse {
    risk_percent: Option<f64>,
    pct: Option<f64>,
    label_pred: Option<String>,
}

impl From<PredictResponse> for ClassifierResult {
    fn from(raw: PredictResponse) -> Self {
        Self {
            risk_percent: raw.risk_percent.or(raw.pct).unwrap_or(0.0),
            label: raw.label_pred.unwrap_or_default(),
        }
    }
}

/// HTTP classifier with ordered endpoint fallback
pub struct ClassifierClient {
    endpoints: Vec<String>,
    http: Client,
}

impl ClassifierClient {
    /// Build a client over the configured endpoints
    ///
    /// Every attempt is bounded by the configured request timeout so the
    /// no-verdict path is reached promptly when a listener hangs.
    pub fn new(config: &GateConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent("PhishShield/0.1")
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self::with_http_client(config.endpoints.clone(), http))
    }

    /// Create a client with a custom HTTP client (for testing with mockito)
    pub fn with_http_client(endpoints: Vec<String>, http: Client) -> Self {
        Self { endpoints, http }
    }

    /// One attempt against one endpoint
    async fn try_endpoint(&self, endpoint: &str, url: &str) -> Result<ClassifierResult> {
        let resp = self
            .http
            .post(endpoint)
            .json(&PredictRequest { url })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(GateError::Classifier(format!(
                "endpoint {} returned status {}",
                endpoint,
                resp.status()
            )));
        }

        let raw: PredictResponse = resp.json().await?;
        Ok(raw.into())
    }
}

#[async_trait]
impl Classifier for ClassifierClient {
    async fn classify(&self, url: &str) -> Option<ClassifierResult> {
        for endpoint in &self.endpoints {
            match self.try_endpoint(endpoint, url).await {
                Ok(result) => {
                    debug!(
                        endpoint = %endpoint,
                        risk_percent = result.risk_percent,
                        label = %result.label,
                        "classifier verdict"
                    );
                    return Some(result);
                }
                Err(e) => {
                    debug!(endpoint = %endpoint, error = %e, "endpoint failed, trying next");
                }
            }
        }
        None
    }
}
