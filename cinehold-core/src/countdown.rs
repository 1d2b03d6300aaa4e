use chrono::{DateTime, Utc};

/// Pure wall-clock countdown state.
///
/// Remaining time is always re-derived from the wall-clock delta against the
/// start of the current budget, never counted in ticks, so a runtime that
/// throttles or suspends periodic callbacks (a backgrounded tab) cannot drift
/// the display. Every trigger source (periodic tick, visibility restore,
/// explicit resync) goes through the same `poll` computation.
#[derive(Debug, Clone)]
pub struct Countdown {
    budget_seconds: u32,
    started_at: DateTime<Utc>,
    /// Bumped on every rebaseline; stale in-flight resyncs compare against it
    baseline: u64,
    expiry_reported: bool,
}

/// Outcome of one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownPoll {
    pub remaining: u32,
    /// True exactly once per baseline, on the poll that first observes zero
    pub expired_now: bool,
}

impl Countdown {
    /// Start counting `budget_seconds` down from `now`
    pub fn start(budget_seconds: u32, now: DateTime<Utc>) -> Self {
        Self {
            budget_seconds,
            started_at: now,
            baseline: 0,
            expiry_reported: false,
        }
    }

    /// Replace the budget with a fresh authoritative value.
    ///
    /// The wall-clock baseline restarts at `now`; the old budget does not
    /// blend into the new one. The expiry guard resets, since a new budget is
    /// a new hold lease.
    pub fn rebaseline(&mut self, budget_seconds: u32, now: DateTime<Utc>) {
        self.budget_seconds = budget_seconds;
        self.started_at = now;
        self.baseline += 1;
        self.expiry_reported = false;
    }

    /// Stamp identifying the current baseline. Capture it before issuing an
    /// async TTL resync and discard the response if the stamp no longer
    /// matches.
    pub fn baseline(&self) -> u64 {
        self.baseline
    }

    /// Seconds remaining at `now`, clamped at zero
    pub fn remaining(&self, now: DateTime<Utc>) -> u32 {
        let elapsed = (now - self.started_at).num_seconds().max(0);
        self.budget_seconds.saturating_sub(elapsed.min(u32::MAX as i64) as u32)
    }

    /// Recompute remaining time and report expiry at most once per baseline
    pub fn poll(&mut self, now: DateTime<Utc>) -> CountdownPoll {
        let remaining = self.remaining(now);
        let expired_now = remaining == 0 && !self.expiry_reported;
        if expired_now {
            self.expiry_reported = true;
        }
        CountdownPoll { remaining, expired_now }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining(now) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_remaining_is_non_increasing() {
        let start = Utc::now();
        let countdown = Countdown::start(30, start);

        let mut previous = u32::MAX;
        for secs in [0, 1, 1, 5, 12, 29, 30, 31, 100] {
            let remaining = countdown.remaining(start + Duration::seconds(secs));
            assert!(remaining <= previous);
            previous = remaining;
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn test_expiry_reported_exactly_once() {
        let start = Utc::now();
        let mut countdown = Countdown::start(10, start);

        let poll = countdown.poll(start + Duration::seconds(5));
        assert_eq!(poll.remaining, 5);
        assert!(!poll.expired_now);

        let poll = countdown.poll(start + Duration::seconds(10));
        assert_eq!(poll.remaining, 0);
        assert!(poll.expired_now);

        // Further polls past zero stay silent
        let poll = countdown.poll(start + Duration::seconds(11));
        assert_eq!(poll.remaining, 0);
        assert!(!poll.expired_now);
    }

    #[test]
    fn test_rebaseline_never_blends_budgets() {
        let start = Utc::now();
        let mut countdown = Countdown::start(300, start);

        // 10 simulated seconds later the server resyncs the TTL to 120
        let resync_at = start + Duration::seconds(10);
        countdown.rebaseline(120, resync_at);

        // The next value derives from 120, not 300 - 10
        assert_eq!(countdown.remaining(resync_at), 120);
        assert_eq!(countdown.remaining(resync_at + Duration::seconds(20)), 100);
    }

    #[test]
    fn test_rebaseline_bumps_stamp_and_rearms_expiry() {
        let start = Utc::now();
        let mut countdown = Countdown::start(1, start);
        let first = countdown.baseline();

        assert!(countdown.poll(start + Duration::seconds(2)).expired_now);

        countdown.rebaseline(60, start + Duration::seconds(3));
        assert!(countdown.baseline() > first);
        assert!(!countdown.poll(start + Duration::seconds(4)).expired_now);
        assert!(countdown.poll(start + Duration::seconds(63)).expired_now);
    }

    #[test]
    fn test_backwards_clock_clamps_to_budget() {
        let start = Utc::now();
        let countdown = Countdown::start(60, start);
        assert_eq!(countdown.remaining(start - Duration::seconds(5)), 60);
    }
}
