use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Per-credential sliding count of request timestamps within the trailing
/// window (spec §3, `RateWindow`). Exact (not a token-bucket approximation):
/// property §8.5 requires that any 1s window contain at most `budget`
/// accepted requests, which a sliding log guarantees and a bucket only
/// approximates.
#[derive(Debug, Default)]
pub struct RateWindow {
    timestamps: VecDeque<Instant>,
}

impl RateWindow {
    const WINDOW: Duration = Duration::from_secs(1);

    pub fn new() -> Self {
        Self::default()
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&front) = self.timestamps.front() {
            if now.duration_since(front) >= Self::WINDOW {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn len(&mut self) -> usize {
        self.prune(Instant::now());
        self.timestamps.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    /// Atomically check-and-record: accepts iff fewer than `budget` requests
    /// are already in the trailing window, matching the
    /// `record_request`/`within_budget` pairing spec §5 requires callers to
    /// treat as one critical section.
    pub fn try_reserve(&mut self, budget: u32, now: Instant) -> Result<(), Duration> {
        self.prune(now);
        if (self.timestamps.len() as u32) < budget {
            self.timestamps.push_back(now);
            Ok(())
        } else {
            let oldest = *self.timestamps.front().expect("budget > 0 implies non-empty when full");
            let retry_after = Self::WINDOW.saturating_sub(now.duration_since(oldest));
            Err(retry_after)
        }
    }

    pub fn remaining(&mut self, budget: u32) -> u32 {
        budget.saturating_sub(self.len() as u32)
    }

    pub fn reset_at(&mut self) -> Option<Instant> {
        self.prune(Instant::now());
        self.timestamps.front().map(|&t| t + Self::WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_up_to_budget_then_rejects() {
        let mut window = RateWindow::new();
        let now = Instant::now();
        for _ in 0..5 {
            assert!(window.try_reserve(5, now).is_ok());
        }
        assert!(window.try_reserve(5, now).is_err());
    }

    #[test]
    fn entries_older_than_one_second_are_pruned() {
        let mut window = RateWindow::new();
        let t0 = Instant::now();
        window.try_reserve(1, t0).unwrap();
        assert!(window.try_reserve(1, t0).is_err());
        let later = t0 + Duration::from_millis(1100);
        assert!(window.try_reserve(1, later).is_ok());
    }

    #[test]
    fn retry_after_is_positive_when_rejected() {
        let mut window = RateWindow::new();
        let now = Instant::now();
        window.try_reserve(1, now).unwrap();
        let err = window.try_reserve(1, now).unwrap_err();
        assert!(err > Duration::ZERO);
    }
}
