//! Per-domain temporary-allow cache
//!
//! A bypass is a user-authorized, time-bounded exemption from blocking for
//! one domain, kept in session storage under a single key. Entries are
//! pruned lazily at the start of every scan; there is no background sweep.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::session::SessionStore;
use crate::types::{BypassEntry, BypassTable};

/// Session-storage key holding the whole bypass table
const BYPASS_KEY: &str = "bypasses";

/// TTL allow-list over the session store
///
/// All mutations are load-modify-save over the full table; `grant` and
/// `purge_expired` serialize through an internal lock so concurrent writers
/// cannot drop each other's entries.
pub struct BypassStore {
    store: Arc<dyn SessionStore>,
    write_lock: Mutex<()>,
}

impl BypassStore {
    /// Create a bypass store over the given session storage
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Load the full table; absent key means an empty table
    pub async fn load(&self) -> Result<BypassTable> {
        match self.store.get(BYPASS_KEY).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(BypassTable::new()),
        }
    }

    /// Persist the full table, replacing prior contents
    pub async fn save(&self, table: &BypassTable) -> Result<()> {
        self.store
            .set(BYPASS_KEY, serde_json::to_value(table)?)
            .await
    }

    /// Grant a bypass for `domain` expiring at `now_ms + ttl_ms`
    ///
    /// Overwrites any existing grant for the domain. Empty domains are
    /// ignored. Storage failures propagate so the requester learns the
    /// grant did not stick.
    pub async fn grant(&self, domain: &str, now_ms: u64, ttl_ms: u64) -> Result<()> {
        if domain.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;
        let mut table = self.load().await?;
        let expires_at_ms = now_ms.saturating_add(ttl_ms);
        table.insert(domain.to_string(), BypassEntry { expires_at_ms });
        self.save(&table).await?;

        tracing::info!(domain = %domain, expires_at_ms, "Bypass granted");
        Ok(())
    }

    /// Whether `domain` currently holds an unexpired grant
    ///
    /// A storage read failure degrades to `false` so scanning proceeds
    /// as if no bypass existed.
    pub async fn is_active(&self, domain: &str, now_ms: u64) -> bool {
        if domain.is_empty() {
            return false;
        }

        let table = match self.load().await {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!(error = %e, "Bypass table unreadable, treating as empty");
                return false;
            }
        };

        table
            .get(domain)
            .map(|entry| entry.is_active(now_ms))
            .unwrap_or(false)
    }

    /// Drop every entry whose expiry has passed
    ///
    /// Saves the table back even when nothing was removed, so repeated
    /// calls are idempotent.
    pub async fn purge_expired(&self, now_ms: u64) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut table = self.load().await?;
        let before = table.len();
        table.retain(|_, entry| entry.expires_at_ms > now_ms);

        if table.len() < before {
            tracing::debug!(removed = before - table.len(), "Purged expired bypasses");
        }
        self.save(&table).await
    }
}
