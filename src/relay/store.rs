//! Relay counter storage.
//!
//! Counters are plain incrementing integers per `(namespace, chain, address)`
//! that disappear when their TTL lapses; there is no sliding window. Flat and
//! campaign counters live in separate namespaces so entering or leaving a
//! campaign never shares quota between the two regimes.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use alloy::primitives::Address;
use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::clock::Clock;

/// Which quota regime a counter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterNamespace {
    Flat,
    Campaign,
}

impl CounterNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "relay",
            Self::Campaign => "relay_no_fee_campaign",
        }
    }
}

/// Identity of one relay counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    pub namespace: CounterNamespace,
    pub chain_id: String,
    pub address: Address,
}

impl CounterKey {
    pub fn new(namespace: CounterNamespace, chain_id: &str, address: Address) -> Self {
        Self {
            namespace,
            chain_id: chain_id.to_string(),
            address,
        }
    }
}

impl std::fmt::Display for CounterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{}", self.namespace.as_str(), self.chain_id, self.address)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
}

/// Key/value storage for relay counters.
///
/// Reads and writes are separate operations; concurrent relays for the same
/// address may both read the same count before either writes.
#[async_trait]
pub trait RelayCounterStore: Send + Sync {
    /// Current count, 0 when absent or expired.
    async fn get_count(&self, key: &CounterKey) -> Result<u64, StoreError>;

    /// Store `count`, expiring after `ttl`.
    async fn set_count(&self, key: &CounterKey, count: u64, ttl: Duration) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy)]
struct CounterEntry {
    count: u64,
    /// `None` when the TTL reaches past what `SystemTime` can represent.
    expires_at: Option<SystemTime>,
}

impl CounterEntry {
    fn is_live(&self, now: SystemTime) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at > now,
            None => true,
        }
    }
}

/// Process-local counter store with lazy expiry.
#[derive(Debug, Clone)]
pub struct InMemoryRelayCounterStore {
    inner: Arc<DashMap<CounterKey, CounterEntry>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRelayCounterStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Drop every expired counter, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.inner.len())
    }

    /// Number of stored counters, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Purge expired counters every `interval` until shutdown.
    pub async fn run_purge(self, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.purge_expired();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.len(), "Purged expired relay counters");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Relay counter purge received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl RelayCounterStore for InMemoryRelayCounterStore {
    async fn get_count(&self, key: &CounterKey) -> Result<u64, StoreError> {
        let now = self.clock.now();
        let count = match self.inner.get(key) {
            Some(entry) if entry.is_live(now) => entry.count,
            _ => 0,
        };
        Ok(count)
    }

    async fn set_count(&self, key: &CounterKey, count: u64, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = self.clock.now().checked_add(ttl);
        self.inner.insert(key.clone(), CounterEntry { count, expires_at });
        Ok(())
    }
}
