//! Coalescing cache.
//!
//! Wraps any keyed async fetch with two guarantees:
//!
//! - **Coalescing**: while a fetch for a key is in flight, later callers for
//!   the same key join it instead of starting another. When it resolves,
//!   every caller gets the same outcome, in the order they joined.
//! - **Memoization**: a successful result is served from memory until it
//!   expires. Results under a fixed revision use the stable lifetime, live
//!   results the volatile one. Failures are never cached. A timer drops each
//!   entry when it expires, so keys that are never requested again do not
//!   pin memory.
//!
//! The fetch runs on its own task, so it completes (and fills the cache)
//! even if the caller that started it is dropped.
//!
//! ```text
//!  caller A ──┐                       ┌──► A: Ok(v)
//!  caller B ──┼─► pending[key] ─► fetch ─► B: Ok(v)   entries[key] = v (until expiry)
//!  caller C ──┘                       └──► C: Ok(v)
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use gitvfs_types::{GitError, Result, Revision};
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::config::CacheLifetimes;

/// Identifies one cached operation: its revision (if any) plus the operation
/// name and arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    revision: Option<Revision>,
    parts: Vec<String>,
}

impl CacheKey {
    pub fn new(revision: Revision, parts: &[&str]) -> Self {
        Self {
            revision: Some(revision),
            parts: parts.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// A key with no revision component, e.g. the resolved head.
    pub fn unversioned(parts: &[&str]) -> Self {
        Self {
            revision: None,
            parts: parts.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn revision(&self) -> Option<&Revision> {
        self.revision.as_ref()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(rev) = &self.revision {
            write!(f, "{rev}")?;
        }
        for part in &self.parts {
            write!(f, ":{part}")?;
        }
        Ok(())
    }
}

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

type Waiter<V> = oneshot::Sender<Result<V>>;

enum Lookup<V> {
    Hit(V),
    Joined(usize),
    Leader,
}

struct Slots<V> {
    entries: HashMap<CacheKey, CacheEntry<V>>,
    pending: HashMap<CacheKey, Vec<Waiter<V>>>,
}

/// Memoizing, request-coalescing wrapper around keyed async fetches.
pub struct Coalescer<V> {
    name: &'static str,
    lifetimes: CacheLifetimes,
    slots: Arc<Mutex<Slots<V>>>,
}

impl<V> Clone for Coalescer<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            lifetimes: self.lifetimes,
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<V> fmt::Debug for Coalescer<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coalescer")
            .field("name", &self.name)
            .field("lifetimes", &self.lifetimes)
            .finish()
    }
}

impl<V> Coalescer<V>
where
    V: Clone + Send + 'static,
{
    /// Create an empty cache. `name` labels its log events.
    pub fn new(name: &'static str, lifetimes: CacheLifetimes) -> Self {
        Self {
            name,
            lifetimes,
            slots: Arc::new(Mutex::new(Slots {
                entries: HashMap::new(),
                pending: HashMap::new(),
            })),
        }
    }

    /// Fetch the value for `(revision, parts)`, coalesced and memoized.
    ///
    /// `revision` is validated first: anything other than the live sentinel
    /// or a 40-hex id fails with `InvalidVersion` and `fetch` is never
    /// called. `fetch` receives the parsed revision.
    pub async fn get_or_fetch<F, Fut>(&self, revision: &str, parts: &[&str], fetch: F) -> Result<V>
    where
        F: FnOnce(Revision) -> Fut + Send,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let revision = Revision::parse(revision)?;
        let lifetime = self.lifetimes.for_live(revision.is_live());
        let key = CacheKey::new(revision.clone(), parts);
        self.fetch_keyed(key, lifetime, move || fetch(revision)).await
    }

    /// Coalesce and memoize under an explicit key and lifetime.
    pub async fn fetch_keyed<F, Fut>(
        &self,
        key: CacheKey,
        lifetime: Duration,
        fetch: F,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let lookup = {
            let mut slots = self.lock();
            let now = Instant::now();
            let fresh = slots
                .entries
                .get(&key)
                .filter(|entry| entry.expires_at > now)
                .map(|entry| entry.value.clone());
            match fresh {
                Some(value) => Lookup::Hit(value),
                None => {
                    // lazily evict an expired entry
                    slots.entries.remove(&key);
                    match slots.pending.get_mut(&key) {
                        Some(waiters) => {
                            waiters.push(tx);
                            Lookup::Joined(waiters.len())
                        }
                        None => {
                            slots.pending.insert(key.clone(), vec![tx]);
                            Lookup::Leader
                        }
                    }
                }
            }
        };

        match lookup {
            Lookup::Hit(value) => {
                tracing::trace!(cache = self.name, %key, "hit");
                return Ok(value);
            }
            Lookup::Joined(waiters) => {
                tracing::trace!(cache = self.name, %key, waiters, "joined in-flight fetch");
            }
            Lookup::Leader => {
                tracing::debug!(cache = self.name, %key, "miss, fetching");
                let guard = PendingGuard {
                    slots: Arc::clone(&self.slots),
                    key: Some(key),
                };
                tokio::spawn(Self::resolve(fetch(), guard, lifetime));
            }
        }

        Self::wait(rx).await
    }

    async fn resolve<Fut>(work: Fut, mut guard: PendingGuard<V>, lifetime: Duration)
    where
        Fut: Future<Output = Result<V>>,
    {
        let outcome = work.await;
        let Some(key) = guard.key.take() else {
            return;
        };

        let expires_at = Instant::now() + lifetime;
        let waiters = {
            let mut slots = lock_slots(&guard.slots);
            let waiters = slots.pending.remove(&key).unwrap_or_default();
            if let Ok(value) = &outcome {
                slots.entries.insert(
                    key.clone(),
                    CacheEntry {
                        value: value.clone(),
                        expires_at,
                    },
                );
            }
            waiters
        };

        if outcome.is_ok() {
            tokio::spawn(Self::evict_at(Arc::downgrade(&guard.slots), key, expires_at));
        }

        for waiter in waiters {
            // receiver gone means that caller was dropped; nothing to deliver
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Drop the entry for `key` once it has expired, unless a newer fetch has
    /// replaced it in the meantime.
    async fn evict_at(slots: Weak<Mutex<Slots<V>>>, key: CacheKey, expires_at: Instant) {
        tokio::time::sleep_until(expires_at).await;
        let Some(slots) = slots.upgrade() else {
            return;
        };
        let mut slots = lock_slots(&slots);
        let now = Instant::now();
        if slots.entries.get(&key).is_some_and(|entry| entry.expires_at <= now) {
            slots.entries.remove(&key);
        }
    }

    async fn wait(rx: oneshot::Receiver<Result<V>>) -> Result<V> {
        rx.await.map_err(|_| GitError::Io {
            kind: std::io::ErrorKind::Interrupted,
            message: "in-flight fetch was abandoned before completing".to_string(),
            path: None,
        })?
    }

    /// Drop a cached value so the next request fetches again.
    pub fn invalidate(&self, key: &CacheKey) {
        self.lock().entries.remove(key);
    }

    /// Drop every cached value. In-flight fetches are unaffected.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Number of cached values, including expired ones whose eviction timer
    /// has not run yet.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Slots<V>> {
        lock_slots(&self.slots)
    }
}

// The lock is only held between suspension points, never across an await,
// so a poisoned lock still holds consistent maps.
fn lock_slots<V>(slots: &Mutex<Slots<V>>) -> MutexGuard<'_, Slots<V>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the pending group if the fetch task ends without resolving it
/// (panic or runtime shutdown), so waiters see an error instead of hanging.
struct PendingGuard<V> {
    slots: Arc<Mutex<Slots<V>>>,
    key: Option<CacheKey>,
}

impl<V> Drop for PendingGuard<V> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            lock_slots(&self.slots).pending.remove(&key);
        }
    }
}
