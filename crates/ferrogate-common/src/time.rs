// ============================================
// File: crates/ferrogate-common/src/time.rs
// ============================================
//! # Time Utilities
//!
//! ## Creation Reason
//! The transport protocol stamps every response with the current Unix time
//! and the UDP session map needs a lock-free last-activity marker that many
//! tasks can update concurrently.
//!
//! ## Main Functionality
//! - `unix_now`: wall-clock seconds since the epoch (response nonces)
//! - `AtomicInstant`: thread-safe last-activity timestamp
//!
//! ## ⚠️ Important Note for Next Developer
//! - `AtomicInstant` stores milliseconds relative to a process-wide anchor;
//!   it is monotonic and never goes backwards with the wall clock
//!
//! ## Last Modified
//! v0.1.0 - Initial time utilities

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Returns the current Unix time in whole seconds.
///
/// Used for the `nonce` field of outgoing packet headers.
#[must_use]
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Thread-safe point-in-time marker backed by an [`AtomicU64`].
///
/// Stores milliseconds elapsed since a process-wide anchor instant, so
/// concurrent readers and writers never take a lock. Millisecond resolution
/// is ample for session idle tracking.
#[derive(Debug)]
pub struct AtomicInstant {
    millis: AtomicU64,
}

fn anchor() -> Instant {
    static ANCHOR: OnceLock<Instant> = OnceLock::new();
    *ANCHOR.get_or_init(Instant::now)
}

impl AtomicInstant {
    /// Creates a marker set to the current time.
    #[must_use]
    pub fn now() -> Self {
        let marker = Self {
            millis: AtomicU64::new(0),
        };
        marker.touch();
        marker
    }

    /// Resets the marker to the current time.
    pub fn touch(&self) {
        let elapsed = anchor().elapsed().as_millis() as u64;
        self.millis.store(elapsed, Ordering::Relaxed);
    }

    /// Returns the time elapsed since the marker was last touched.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        let stored = self.millis.load(Ordering::Relaxed);
        let now = anchor().elapsed().as_millis() as u64;
        Duration::from_millis(now.saturating_sub(stored))
    }

    /// Returns `true` if the marker has been idle longer than `ttl`.
    #[must_use]
    pub fn idle_longer_than(&self, ttl: Duration) -> bool {
        self.elapsed() > ttl
    }
}

impl Default for AtomicInstant {
    fn default() -> Self {
        Self::now()
    }
}
