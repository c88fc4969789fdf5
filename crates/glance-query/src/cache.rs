//! Time-to-live memoization for expensive, side-effect-free backend reads.
//!
//! Repeated UI interactions (re-selecting the same project, re-rendering the
//! same preview) should not repeat network calls. Each cache instance wraps
//! one kind of read with one TTL; only successful results are stored. There
//! is no eviction beyond TTL replacement: key cardinality is bounded by what
//! a human can drive through the UI, so unbounded growth is accepted.

use crate::error::Result;
use crate::traits::Connector;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Cache key: connector identity plus call arguments.
///
/// The connector participates by identity (its `Arc` pointer), not by value;
/// identity is stable because connectors have singleton lifetime in the
/// resolver slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    connector: usize,
    op: &'static str,
    args: Vec<String>,
}

impl CacheKey {
    pub fn new(connector: &Arc<dyn Connector>, op: &'static str, args: Vec<String>) -> Self {
        Self {
            connector: Arc::as_ptr(connector) as *const () as usize,
            op,
            args,
        }
    }

    /// Key for an operation with no connector (e.g. a fixed remote document)
    pub fn detached(op: &'static str, args: Vec<String>) -> Self {
        Self {
            connector: 0,
            op,
            args,
        }
    }
}

struct CacheEntry<V> {
    value: V,
    created_at: Instant,
}

/// Key-based memoization with a time-to-live expiry.
///
/// `V` is the result type of the wrapped read; one cache instance per
/// operation family keeps the map homogeneous. Concurrent writers for the
/// same key are tolerated (last write wins; both computed the same
/// deterministic read).
pub struct QueryCache<V> {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry<V>>>,
}

impl<V: Clone> QueryCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the live cached value for `key`, or invoke `compute`, store its
    /// success and return it. Failures are propagated and never cached, so
    /// the next call retries unconditionally.
    pub async fn get_or_compute<F, Fut>(&self, key: CacheKey, compute: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&key) {
                if entry.created_at.elapsed() < self.ttl {
                    trace!(op = key.op, "Cache hit");
                    return Ok(entry.value.clone());
                }
            }
        }

        debug!(op = key.op, "Cache miss, invoking backend");
        let value = compute().await?;

        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CacheEntry {
                value: value.clone(),
                created_at: Instant::now(),
            },
        );

        Ok(value)
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop all entries (process restart equivalent for tests)
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}
