//! # phishshield
//!
//! Navigation-time URL phishing scan gate with classifier fallback and
//! per-domain bypass caching.
//!
//! ## Overview
//!
//! `phishshield` decides, per page load, whether a browsing session may
//! proceed: it consults a remote URL classifier (trying an ordered list of
//! endpoints, first answer wins) and redirects the session to a block page
//! when the verdict crosses the configured risk threshold. Users can grant
//! a time-bounded bypass per domain after a block. The gate fails open:
//! classifier outages, malformed responses, and storage failures all
//! resolve to "allow" so browsing never breaks. Hosts wanting stricter
//! behavior can wrap the [`Classifier`] seam.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use phishshield::{
//!     ChannelEventSource, GateConfig, MemorySessionStore, NavigationEvent,
//!     NavigationGate, SessionId, SessionRedirector,
//! };
//!
//! # struct HostTabs;
//! # #[async_trait::async_trait]
//! # impl SessionRedirector for HostTabs {
//! #     async fn redirect(&self, _: SessionId, _: &str) -> phishshield::Result<()> { Ok(()) }
//! #     async fn current_url(&self, _: SessionId) -> phishshield::Result<Option<String>> { Ok(None) }
//! # }
//! # async fn example() -> phishshield::Result<()> {
//! let (events_tx, events) = ChannelEventSource::new(64);
//! let (gate, handle) = NavigationGate::with_http_classifier(
//!     GateConfig::default(),
//!     Arc::new(MemorySessionStore::default()),
//!     Arc::new(HostTabs),
//! )?;
//! tokio::spawn(gate.run(events));
//!
//! // Feed host navigation callbacks into the gate
//! events_tx
//!     .send(NavigationEvent::complete(SessionId(1), "http://example.com/"))
//!     .await
//!     .ok();
//!
//! // Grant a 30-minute bypass from the block page UI
//! let ack = handle.request_bypass("example.com").await?;
//! assert!(ack.ok);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **ScanEngine**: per-navigation pipeline of eligibility check, bypass
//!   purge and lookup, classification, and block policy
//! - **ClassifierClient**: HTTP fallback client over the endpoint list
//! - **BypassStore**: TTL allow-list in host session storage
//! - **NavigationGate**: run loop wiring host events and UI messages to
//!   the engine
//! - **SessionStore / SessionRedirector / NavigationEventSource**: traits
//!   for the host seams

pub mod bypass;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod metrics;
pub mod session;
pub mod types;

// Re-export core types
pub use bypass::BypassStore;
pub use classifier::{Classifier, ClassifierClient};
pub use config::GateConfig;
pub use engine::{eligible_host, ScanEngine};
pub use error::{GateError, Result};
pub use gate::{
    ChannelEventSource, GateHandle, NavigationEventSource, NavigationGate, SessionRedirector,
};
pub use metrics::{GateMetrics, MetricsSnapshot};
pub use session::{MemorySessionStore, SessionStore};
pub use types::{
    now_millis, BypassAck, BypassEntry, BypassTable, ClassifierResult, Decision, GateMessage,
    NavigationEvent, NavigationPhase, SessionId,
};
