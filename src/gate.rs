//! Navigation gate
//!
//! Event-driven orchestration over the scan engine: each qualifying host
//! navigation is scanned on its own task, and blocked sessions are
//! redirected to the block page. A cloneable handle lets the host UI grant
//! per-domain bypasses; acknowledgments are deferred until the grant is
//! durably stored.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

use crate::bypass::BypassStore;
use crate::classifier::{Classifier, ClassifierClient};
use crate::config::GateConfig;
use crate::engine::ScanEngine;
use crate::error::{GateError, Result};
use crate::metrics::GateMetrics;
use crate::session::SessionStore;
use crate::types::{
    now_millis, BypassAck, Decision, GateMessage, NavigationEvent, NavigationPhase, SessionId,
};

/// Queue depth for control messages from gate handles
const COMMAND_BUFFER: usize = 32;

/// Source of navigation lifecycle events from the host
#[async_trait]
pub trait NavigationEventSource: Send {
    /// Next event; `None` once the host stops delivering
    ///
    /// The gate polls this inside `select!` and drops the future whenever
    /// another branch completes first, so `next` must be cancel safe: no
    /// event may be lost when the future is dropped mid-poll.
    /// `ChannelEventSource` inherits this from `mpsc::Receiver::recv`.
    async fn next(&mut self) -> Option<NavigationEvent>;
}

/// Host control surface for browsing sessions
#[async_trait]
pub trait SessionRedirector: Send + Sync {
    /// Navigate `session` to `url`
    ///
    /// Hosts report refusals as [`GateError::Redirect`]; the gate logs the
    /// failure and leaves the session where it is.
    async fn redirect(&self, session: SessionId, url: &str) -> Result<()>;

    /// URL `session` currently shows; `None` when the session is gone
    async fn current_url(&self, session: SessionId) -> Result<Option<String>>;
}

/// mpsc-backed event source for in-process hosts
pub struct ChannelEventSource {
    rx: mpsc::Receiver<NavigationEvent>,
}

impl ChannelEventSource {
    /// Create a source and the sender half the host pushes events into
    pub fn new(capacity: usize) -> (mpsc::Sender<NavigationEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }
}

#[async_trait]
impl NavigationEventSource for ChannelEventSource {
    async fn next(&mut self) -> Option<NavigationEvent> {
        self.rx.recv().await
    }
}

/// One queued control message plus its response slot
struct GateCommand {
    message: GateMessage,
    responder: oneshot::Sender<Result<BypassAck>>,
}

/// Cloneable handle for sending control messages to a running gate
#[derive(Clone)]
pub struct GateHandle {
    tx: mpsc::Sender<GateCommand>,
}

impl GateHandle {
    /// Grant a temporary bypass for `domain`
    ///
    /// Resolves with `{ok: true}` only after the grant is persisted, so a
    /// caller reloading the page right away will find the bypass active.
    /// Storage failures come back as errors.
    pub async fn request_bypass(&self, domain: impl Into<String>) -> Result<BypassAck> {
        self.send(GateMessage::SetDomainBypass {
            domain: domain.into(),
        })
        .await
    }

    /// Send a raw control message and await its acknowledgment
    pub async fn send(&self, message: GateMessage) -> Result<BypassAck> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(GateCommand {
                message,
                responder: tx,
            })
            .await
            .map_err(|_| GateError::ChannelClosed("gate is not running".to_string()))?;
        rx.await
            .map_err(|_| GateError::ChannelClosed("gate dropped the request".to_string()))?
    }
}

/// Build the block-page URL carrying the blocked URL in the `u` parameter
fn block_url(block_page: &str, blocked: &str) -> Result<Url> {
    Url::parse_with_params(block_page, &[("u", blocked)])
        .map_err(|e| GateError::Config(format!("block page URL invalid: {}", e)))
}

/// Navigation-time scan gate
///
/// Owns the run loop; collaborators arrive as trait objects so the crate
/// compiles with no host dependency.
pub struct NavigationGate {
    engine: Arc<ScanEngine>,
    bypass: Arc<BypassStore>,
    redirector: Arc<dyn SessionRedirector>,
    command_rx: mpsc::Receiver<GateCommand>,
}

impl NavigationGate {
    /// Wire a gate over explicit collaborators
    pub fn new(
        config: GateConfig,
        store: Arc<dyn SessionStore>,
        classifier: Arc<dyn Classifier>,
        redirector: Arc<dyn SessionRedirector>,
    ) -> Result<(Self, GateHandle)> {
        config.validate()?;
        let bypass = Arc::new(BypassStore::new(store));
        let engine = Arc::new(ScanEngine::new(bypass.clone(), classifier, config));
        let (tx, command_rx) = mpsc::channel(COMMAND_BUFFER);

        Ok((
            Self {
                engine,
                bypass,
                redirector,
                command_rx,
            },
            GateHandle { tx },
        ))
    }

    /// Wire a gate over the standard HTTP classifier
    pub fn with_http_classifier(
        config: GateConfig,
        store: Arc<dyn SessionStore>,
        redirector: Arc<dyn SessionRedirector>,
    ) -> Result<(Self, GateHandle)> {
        let classifier = Arc::new(ClassifierClient::new(&config)?);
        Self::new(config, store, classifier, redirector)
    }

    /// Outcome counters, shared with any clone taken before `run`
    pub fn metrics(&self) -> Arc<GateMetrics> {
        self.engine.metrics_handle()
    }

    /// Drive the gate until the event source is exhausted and every handle
    /// is dropped
    ///
    /// In-flight scans are awaited before returning.
    pub async fn run(mut self, mut events: impl NavigationEventSource) {
        let mut scans = JoinSet::new();
        let mut events_done = false;
        let mut commands_done = false;

        while !(events_done && commands_done) {
            tokio::select! {
                event = events.next(), if !events_done => {
                    match event {
                        Some(event) => self.handle_navigation(event, &mut scans),
                        None => events_done = true,
                    }
                }
                command = self.command_rx.recv(), if !commands_done => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => commands_done = true,
                    }
                }
                Some(_) = scans.join_next(), if !scans.is_empty() => {}
            }
        }

        while scans.join_next().await.is_some() {}
    }

    /// Queue a scan for a qualifying navigation event
    fn handle_navigation(&self, event: NavigationEvent, scans: &mut JoinSet<()>) {
        // Only the final URL of a navigation is worth scanning
        if event.phase == NavigationPhase::Started {
            return;
        }

        // Never scan our own block page or the redirect loops forever
        if event.url.starts_with(&self.engine.config().block_page) {
            debug!(session = %event.session, "own block page, skipping scan");
            return;
        }

        let engine = self.engine.clone();
        let redirector = self.redirector.clone();
        scans.spawn(async move {
            Self::scan_navigation(engine, redirector, event).await;
        });
    }

    /// Evaluate one navigation and redirect on Block
    async fn scan_navigation(
        engine: Arc<ScanEngine>,
        redirector: Arc<dyn SessionRedirector>,
        event: NavigationEvent,
    ) {
        let decision = engine.evaluate(&event.url, now_millis()).await;
        if decision != Decision::Block {
            return;
        }

        // The session may have moved on while the scan ran; a redirect
        // based on a stale URL would hijack whatever it shows now
        match redirector.current_url(event.session).await {
            Ok(Some(current)) if current == event.url => {}
            Ok(current) => {
                warn!(
                    session = %event.session,
                    scanned = %event.url,
                    current = ?current,
                    "session moved on, dropping stale block"
                );
                return;
            }
            Err(e) => {
                warn!(
                    session = %event.session,
                    error = %e,
                    "cannot inspect session, dropping block"
                );
                return;
            }
        }

        let target = match block_url(&engine.config().block_page, &event.url) {
            Ok(target) => target,
            Err(e) => {
                warn!(error = %e, "cannot build block page URL");
                return;
            }
        };

        match redirector.redirect(event.session, target.as_str()).await {
            Ok(()) => {
                engine.metrics().record_redirect();
                info!(
                    session = %event.session,
                    url = %event.url,
                    "session redirected to block page"
                );
            }
            Err(e) => {
                warn!(session = %event.session, error = %e, "redirect failed");
            }
        }
    }

    /// Apply one control message and answer its responder
    async fn handle_command(&self, command: GateCommand) {
        let GateCommand { message, responder } = command;
        let result = match message {
            GateMessage::SetDomainBypass { domain } => self.grant_bypass(&domain).await,
        };
        let _ = responder.send(result);
    }

    async fn grant_bypass(&self, domain: &str) -> Result<BypassAck> {
        let ttl_ms = self.engine.config().bypass_ttl_ms;
        self.bypass.grant(domain, now_millis(), ttl_ms).await?;
        self.engine.metrics().record_grant();
        Ok(BypassAck { ok: true })
    }
}
