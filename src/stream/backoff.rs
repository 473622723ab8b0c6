//! Jittered exponential backoff for worker retries

use std::time::Duration;

use rand::Rng;

/// Retry schedule knobs for a stream worker
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Delay before the first retry (pre-jitter)
    pub initial_delay: Duration,
    /// Growth factor applied per consecutive failure
    pub multiplier: f64,
    /// Hard cap on any single delay, jitter included
    pub max_delay: Duration,
    /// Consecutive failures tolerated before the worker gives up
    pub max_failures: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
            max_failures: 8,
        }
    }
}

impl BackoffPolicy {
    /// Set the initial delay
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the growth multiplier
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Set the delay cap
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the consecutive-failure budget
    pub fn max_failures(mut self, failures: u32) -> Self {
        self.max_failures = failures;
        self
    }
}

/// Mutable retry state carried by a worker across failures
#[derive(Debug, Default)]
pub struct BackoffState {
    attempts: u32,
}

impl BackoffState {
    /// Fresh state with no recorded failures
    pub fn new() -> Self {
        Self::default()
    }

    /// Consecutive failures recorded so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record a failure and compute the next delay
    ///
    /// Returns `None` when the failure budget is exhausted. The delay grows
    /// exponentially, is multiplied by a jitter factor in `[0.5, 1.5)` to
    /// de-synchronize retries across workers, and never exceeds
    /// `policy.max_delay`.
    pub fn next_delay(&mut self, policy: &BackoffPolicy) -> Option<Duration> {
        if self.attempts >= policy.max_failures {
            return None;
        }

        let exp = policy.initial_delay.as_secs_f64()
            * policy.multiplier.powi(self.attempts as i32);
        self.attempts += 1;

        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        // Cap in float space: the raw exponential overflows Duration's
        // range long before a large failure budget is spent.
        let secs = (exp * jitter).min(policy.max_delay.as_secs_f64());
        Some(Duration::from_secs_f64(secs))
    }

    /// Clear the failure count after a successful production step
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy::default()
            .initial_delay(Duration::from_millis(100))
            .multiplier(2.0)
            .max_delay(Duration::from_secs(1))
            .max_failures(4)
    }

    #[test]
    fn test_budget_exhaustion() {
        let policy = policy();
        let mut state = BackoffState::new();

        for _ in 0..4 {
            assert!(state.next_delay(&policy).is_some());
        }
        assert_eq!(state.attempts(), 4);
        assert!(state.next_delay(&policy).is_none());
        // Stays exhausted
        assert!(state.next_delay(&policy).is_none());
    }

    #[test]
    fn test_delay_never_exceeds_cap() {
        let policy = policy();
        let mut state = BackoffState::new();

        while let Some(delay) = state.next_delay(&policy) {
            assert!(delay <= policy.max_delay);
        }
    }

    #[test]
    fn test_delays_grow_within_jitter_bounds() {
        let policy = BackoffPolicy::default()
            .initial_delay(Duration::from_millis(100))
            .multiplier(2.0)
            .max_delay(Duration::from_secs(3600))
            .max_failures(5);
        let mut state = BackoffState::new();

        for attempt in 0..5 {
            let base = 0.1 * 2f64.powi(attempt);
            let delay = state.next_delay(&policy).unwrap().as_secs_f64();
            // Bounds widened slightly for nanosecond rounding
            assert!(delay >= base * 0.49, "attempt {attempt}: {delay} too small");
            assert!(delay <= base * 1.51, "attempt {attempt}: {delay} too large");
        }
    }

    #[test]
    fn test_large_budget_never_overflows_duration() {
        let policy = BackoffPolicy::default().max_failures(200);
        let mut state = BackoffState::new();

        for attempt in 0..200 {
            let delay = state
                .next_delay(&policy)
                .unwrap_or_else(|| panic!("budget spent early at attempt {attempt}"));
            assert!(delay <= policy.max_delay);
        }
        assert!(state.next_delay(&policy).is_none());
    }

    #[test]
    fn test_reset_restores_budget() {
        let policy = policy();
        let mut state = BackoffState::new();

        for _ in 0..4 {
            state.next_delay(&policy);
        }
        assert!(state.next_delay(&policy).is_none());

        state.reset();
        assert_eq!(state.attempts(), 0);
        assert!(state.next_delay(&policy).is_some());
    }
}
