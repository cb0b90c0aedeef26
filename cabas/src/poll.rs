//! Bounded polling. The target application emits no events, so every wait
//! in this crate is a fixed-interval poll with an overall deadline.

use std::time::{Duration, Instant};

/// Re-evaluates `condition` every `interval` until it returns `true` or
/// `timeout` has elapsed. Returns whether the condition was met.
///
/// The condition is always checked at least once, immediately. On failure
/// the call returns no earlier than `timeout` and no later than
/// `timeout + interval` (plus the cost of one final check).
pub fn poll_until(
    timeout: Duration,
    interval: Duration,
    mut condition: impl FnMut() -> bool,
) -> bool {
    let start = Instant::now();
    loop {
        if condition() {
            return true;
        }
        if start.elapsed() >= timeout {
            return false;
        }
        std::thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_true_immediately_when_condition_holds() {
        let start = Instant::now();
        assert!(poll_until(Duration::from_secs(5), Duration::from_millis(50), || true));
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn failure_lands_between_timeout_and_timeout_plus_interval() {
        let timeout = Duration::from_millis(80);
        let interval = Duration::from_millis(20);
        let start = Instant::now();
        assert!(!poll_until(timeout, interval, || false));
        let elapsed = start.elapsed();
        assert!(elapsed >= timeout, "gave up too early: {elapsed:?}");
        // Generous upper slack for scheduler jitter on loaded CI machines.
        assert!(
            elapsed < timeout + interval + Duration::from_millis(40),
            "gave up too late: {elapsed:?}"
        );
    }

    #[test]
    fn condition_becoming_true_mid_wait_is_observed() {
        let mut calls = 0;
        let ok = poll_until(Duration::from_millis(500), Duration::from_millis(10), || {
            calls += 1;
            calls >= 3
        });
        assert!(ok);
        assert_eq!(calls, 3);
    }
}
