use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Tracks failed-authentication timestamps per peer so the gateway can flag
/// brute-force probing without rejecting honest retries (spec §4.F).
pub struct AuthLog {
    window: Duration,
    failures: DashMap<String, VecDeque<Instant>>,
}

impl AuthLog {
    pub fn new(window: Duration) -> Self {
        Self { window, failures: DashMap::new() }
    }

    fn prune(queue: &mut VecDeque<Instant>, window: Duration, now: Instant) {
        while let Some(&front) = queue.front() {
            if now.duration_since(front) >= window {
                queue.pop_front();
            } else {
                break;
            }
        }
    }

    /// Records a failed authentication attempt from `peer`.
    pub fn record_failure(&self, peer: &str) {
        let now = Instant::now();
        let mut queue = self.failures.entry(peer.to_string()).or_default();
        Self::prune(&mut queue, self.window, now);
        queue.push_back(now);
    }

    /// Clears history for a peer on a successful authentication.
    pub fn record_success(&self, peer: &str) {
        self.failures.remove(peer);
    }

    /// `true` iff `peer` has accumulated at least `threshold` failures within
    /// the trailing window.
    pub fn is_blocked(&self, peer: &str, threshold: u32) -> bool {
        let Some(mut queue) = self.failures.get_mut(peer) else { return false };
        let now = Instant::now();
        Self::prune(&mut queue, self.window, now);
        queue.len() as u32 >= threshold
    }
}

impl Default for AuthLog {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_threshold_failures() {
        let log = AuthLog::new(Duration::from_secs(60));
        for _ in 0..4 {
            log.record_failure("peer-a");
        }
        assert!(!log.is_blocked("peer-a", 5));
        log.record_failure("peer-a");
        assert!(log.is_blocked("peer-a", 5));
    }

    #[test]
    fn success_clears_failure_history() {
        let log = AuthLog::new(Duration::from_secs(60));
        for _ in 0..5 {
            log.record_failure("peer-b");
        }
        assert!(log.is_blocked("peer-b", 5));
        log.record_success("peer-b");
        assert!(!log.is_blocked("peer-b", 5));
    }

    #[test]
    fn unknown_peer_is_never_blocked() {
        let log = AuthLog::new(Duration::from_secs(60));
        assert!(!log.is_blocked("nobody", 1));
    }
}
