//! Session storage seam
//!
//! The bypass table lives in host-provided session storage behind a tiny
//! key-value contract. Hosts bridge this to whatever their platform offers;
//! `MemorySessionStore` ships for tests and for hosts whose storage is
//! genuinely session-scoped (state dies with the process, as intended).

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::Result;

/// Trait for the host's session-scoped key-value storage
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the value stored under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Store `value` under `key`, replacing any prior value
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()>;
}

/// In-memory session store
///
/// Contents are lost on drop, matching session-storage semantics.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, serde_json::Value>>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}
