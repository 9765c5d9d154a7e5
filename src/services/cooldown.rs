//! Classification cooldown tracker
//!
//! Identities whose lookup hit the upstream rate limit are suppressed from
//! further lookups until their entry expires. Expiry is lazy: a min-heap of
//! `(expiry, uid)` is drained on every `has`/`add`/`len`, so no timer task is
//! spawned per entry. Re-adding an identity that is still cooling down keeps
//! the earlier expiry.

use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct CooldownState {
    /// uid -> expiry
    entries: HashMap<i64, Instant>,
    /// min-heap by expiry; may hold stale pairs for removed uids
    expiries: BinaryHeap<Reverse<(Instant, i64)>>,
}

impl CooldownState {
    fn purge(&mut self, now: Instant) {
        while let Some(Reverse((expiry, uid))) = self.expiries.peek().copied() {
            if expiry > now {
                break;
            }
            self.expiries.pop();
            // only drop the live entry if this heap node is the one that set it
            if self.entries.get(&uid) == Some(&expiry) {
                self.entries.remove(&uid);
            }
        }
    }
}

#[derive(Debug)]
pub struct CooldownTracker {
    duration: Duration,
    state: Mutex<CooldownState>,
}

impl CooldownTracker {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            state: Mutex::new(CooldownState::default()),
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Start a cooldown for `uid`. Returns `false` if it was already cooling down.
    pub fn add(&self, uid: i64) -> bool {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.purge(now);

        if state.entries.contains_key(&uid) {
            return false;
        }
        let expiry = now + self.duration;
        state.entries.insert(uid, expiry);
        state.expiries.push(Reverse((expiry, uid)));
        true
    }

    pub fn remove(&self, uid: i64) -> bool {
        self.state.lock().entries.remove(&uid).is_some()
    }

    pub fn has(&self, uid: i64) -> bool {
        let mut state = self.state.lock();
        state.purge(Instant::now());
        state.entries.contains_key(&uid)
    }

    /// Time left before `uid` may be looked up again.
    pub fn remaining(&self, uid: i64) -> Option<Duration> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.purge(now);
        state
            .entries
            .get(&uid)
            .map(|expiry| expiry.saturating_duration_since(now))
    }

    pub fn len(&self) -> usize {
        let mut state = self.state.lock();
        state.purge(Instant::now());
        state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEN_MINUTES: Duration = Duration::from_secs(600);

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_duration() {
        let tracker = CooldownTracker::new(TEN_MINUTES);
        assert!(!tracker.has(42));

        assert!(tracker.add(42));
        assert!(tracker.has(42));

        tokio::time::advance(Duration::from_secs(599)).await;
        assert!(tracker.has(42));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!tracker.has(42));
        assert!(tracker.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_readd_keeps_earlier_expiry() {
        let tracker = CooldownTracker::new(TEN_MINUTES);
        tracker.add(7);

        tokio::time::advance(Duration::from_secs(300)).await;
        assert!(!tracker.add(7));
        assert_eq!(tracker.remaining(7), Some(Duration::from_secs(300)));

        tokio::time::advance(Duration::from_secs(300)).await;
        assert!(!tracker.has(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_then_readd_gets_fresh_expiry() {
        let tracker = CooldownTracker::new(TEN_MINUTES);
        tracker.add(1);
        tokio::time::advance(Duration::from_secs(100)).await;

        assert!(tracker.remove(1));
        assert!(!tracker.remove(1));
        assert!(tracker.add(1));

        // the stale heap node from the first add must not evict the new entry
        tokio::time::advance(Duration::from_secs(500)).await;
        assert!(tracker.has(1));

        tokio::time::advance(Duration::from_secs(100)).await;
        assert!(!tracker.has(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_len_counts_only_live_entries() {
        let tracker = CooldownTracker::new(TEN_MINUTES);
        tracker.add(1);
        tokio::time::advance(Duration::from_secs(60)).await;
        tracker.add(2);
        assert_eq!(tracker.len(), 2);

        tokio::time::advance(Duration::from_secs(540)).await;
        assert_eq!(tracker.len(), 1);
        assert!(tracker.has(2));
    }
}
