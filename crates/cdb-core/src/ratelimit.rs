//! Per-user message-rate guard.
//!
//! Coarse fixed 1-second window rather than a precise sliding window: the
//! counter resets whenever more than a second has passed since the window
//! started, so a burst spanning a window boundary can admit up to twice the
//! burst limit in just under two seconds. Good enough for flood control.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use crate::domain::UserId;

#[derive(Clone, Copy, Debug)]
struct RateCounter {
    count: u32,
    window_start: Instant,
    blocked_until: Option<Instant>,
}

/// One counter per user identity. Counters are created lazily and never
/// evicted; unbounded growth with distinct users is a documented limitation.
#[derive(Debug)]
pub struct RateLimiter {
    burst: u32,
    block: Duration,
    counters: HashMap<UserId, RateCounter>,
}

impl RateLimiter {
    pub fn new(burst: u32, block: Duration) -> Self {
        Self {
            burst,
            block,
            counters: HashMap::new(),
        }
    }

    /// Admit or deny one message from `user`. Denial does not consume budget.
    pub fn allow(&mut self, user: UserId) -> bool {
        self.allow_at(user, Instant::now())
    }

    pub fn allow_at(&mut self, user: UserId, now: Instant) -> bool {
        let counter = self.counters.entry(user).or_insert(RateCounter {
            count: 0,
            window_start: now,
            blocked_until: None,
        });

        if now.duration_since(counter.window_start) > Duration::from_secs(1) {
            counter.count = 0;
            counter.window_start = now;
        }

        if let Some(until) = counter.blocked_until {
            if until > now {
                return false;
            }
            counter.blocked_until = None;
        }

        counter.count += 1;
        if counter.count > self.burst {
            counter.blocked_until = Some(now + self.block);
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(6, Duration::from_secs(10))
    }

    #[test]
    fn seventh_message_in_window_is_denied() {
        let mut rl = limiter();
        let t0 = Instant::now();
        for _ in 0..6 {
            assert!(rl.allow_at(UserId(1), t0));
        }
        assert!(!rl.allow_at(UserId(1), t0));
    }

    #[test]
    fn block_holds_for_ten_seconds_then_lifts() {
        let mut rl = limiter();
        let t0 = Instant::now();
        for _ in 0..7 {
            rl.allow_at(UserId(1), t0);
        }
        // Denied through the block period even after the window resets.
        assert!(!rl.allow_at(UserId(1), t0 + Duration::from_secs(5)));
        assert!(!rl.allow_at(UserId(1), t0 + Duration::from_millis(9_999)));
        // First message after the block period is admitted.
        assert!(rl.allow_at(UserId(1), t0 + Duration::from_millis(10_001)));
    }

    #[test]
    fn window_reset_clears_count() {
        let mut rl = limiter();
        let t0 = Instant::now();
        for _ in 0..6 {
            assert!(rl.allow_at(UserId(1), t0));
        }
        // More than one second later the count starts over.
        let t1 = t0 + Duration::from_millis(1_001);
        for _ in 0..6 {
            assert!(rl.allow_at(UserId(1), t1));
        }
    }

    #[test]
    fn users_are_independent() {
        let mut rl = limiter();
        let t0 = Instant::now();
        for _ in 0..7 {
            rl.allow_at(UserId(1), t0);
        }
        assert!(!rl.allow_at(UserId(1), t0));
        assert!(rl.allow_at(UserId(2), t0));
    }
}
