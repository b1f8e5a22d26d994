// ============================================
// File: crates/ferrogate-server/src/sessions.rs
// ============================================
//! # UDP Session Map
//!
//! ## Creation Reason
//! UDP has no connection to hang per-peer state on, so session contexts are
//! keyed by peer address in a concurrent map with idle expiry.
//!
//! ## Contract
//! - Lookup-or-create for a peer address is atomic
//! - Entries expire after 5 minutes of inactivity, removed by a sweep task
//!   on a 5-minute interval
//! - Operations on one peer's context are serialized by its `Mutex`; the
//!   connection wrapper holds the lock for a whole request
//!
//! ## ⚠️ Important Note for Next Developer
//! - TCP sessions never enter this map; they live and die with their
//!   connection
//!
//! ## Last Modified
//! v0.1.0 - Initial session map

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

use ferrogate_common::AtomicInstant;
use ferrogate_core::SessionContext;

/// Session context shared between datagram workers of one peer.
pub type SharedContext = Arc<Mutex<SessionContext>>;

/// Idle lifetime of a UDP session.
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(5 * 60);

/// Interval between expiry sweeps.
pub const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

struct SessionEntry {
    ctx: SharedContext,
    last_seen: AtomicInstant,
}

/// Concurrent peer-address → session-context map with idle expiry.
pub struct SessionMap {
    entries: DashMap<SocketAddr, SessionEntry>,
    ttl: Duration,
}

impl SessionMap {
    /// Creates a map whose entries expire after `ttl` of inactivity.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Returns the context for `peer`, creating it atomically on first
    /// contact, and refreshes its activity marker.
    pub fn get_or_create(&self, peer: SocketAddr) -> SharedContext {
        let entry = self.entries.entry(peer).or_insert_with(|| {
            debug!(%peer, "creating udp session context");
            SessionEntry {
                ctx: Arc::new(Mutex::new(SessionContext::new(peer))),
                last_seen: AtomicInstant::now(),
            }
        });
        entry.last_seen.touch();
        Arc::clone(&entry.ctx)
    }

    /// Removes entries idle past the TTL; returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.last_seen.idle_longer_than(self.ttl));
        before - self.entries.len()
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for SessionMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMap")
            .field("sessions", &self.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Spawns the periodic expiry sweep for `map`.
pub fn spawn_sweeper(
    map: Arc<SessionMap>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        // The first tick fires immediately; skip it.
        timer.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = timer.tick() => {
                    let removed = map.sweep();
                    if removed > 0 {
                        debug!(removed, remaining = map.len(), "expired idle udp sessions");
                    }
                }
            }
        }
        debug!("session sweeper exiting");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[tokio::test]
    async fn test_lookup_is_stable_per_peer() {
        let map = SessionMap::new(SESSION_IDLE_TTL);

        let first = map.get_or_create(peer(1000));
        let second = map.get_or_create(peer(1000));
        assert!(Arc::ptr_eq(&first, &second));

        let other = map.get_or_create(peer(1001));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(map.len(), 2);
    }

    #[tokio::test]
    async fn test_context_keeps_state_between_lookups() {
        let map = SessionMap::new(SESSION_IDLE_TTL);

        map.get_or_create(peer(2000)).lock().await.check_and_set_ack(9);
        let ctx = map.get_or_create(peer(2000));
        assert_eq!(ctx.lock().await.ack(), 9);
    }

    #[tokio::test]
    async fn test_sweep_removes_idle_entries() {
        let map = SessionMap::new(Duration::from_millis(10));
        map.get_or_create(peer(3000));
        assert_eq!(map.len(), 1);

        // Fresh entry survives a sweep.
        assert_eq!(map.sweep(), 0);

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(map.sweep(), 1);
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn test_activity_defers_expiry() {
        let map = SessionMap::new(Duration::from_millis(40));
        map.get_or_create(peer(4000));

        tokio::time::sleep(Duration::from_millis(25)).await;
        // Renewed contact resets the idle clock.
        map.get_or_create(peer(4000));
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(map.sweep(), 0);
    }

    #[tokio::test]
    async fn test_sweeper_task() {
        let map = Arc::new(SessionMap::new(Duration::from_millis(10)));
        map.get_or_create(peer(5000));

        let (tx, rx) = broadcast::channel(1);
        let handle = spawn_sweeper(Arc::clone(&map), Duration::from_millis(20), rx);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(map.is_empty());

        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
