//! Bounded retry for flaky reads against remote or networked storage.

use std::time::Duration;

use rand::Rng;

use crate::errors::{CovmatError, Result};

/// Retry budget for one logical read: total attempt count and the delay
/// window sampled between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 3,
            min_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A single attempt and no back-off, for local sources and tests.
    pub fn none() -> Self {
        RetryPolicy {
            attempts: 1,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Run `op` until it succeeds or the budget is spent, sleeping a
    /// uniformly random duration from the delay window between attempts.
    pub fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut rng = rand::rng();
        self.run_with(
            op,
            |lo, hi| Duration::from_secs_f64(rng.random_range(lo.as_secs_f64()..=hi.as_secs_f64())),
            std::thread::sleep,
        )
    }

    /// [`RetryPolicy::run`] with the jitter and sleep functions supplied
    /// by the caller, so tests can simulate flakiness without real
    /// delays. Non-transient errors (bad configuration, unknown
    /// chromosome) are returned immediately; exhausting the budget on
    /// transient errors yields a fatal error carrying the last cause.
    pub fn run_with<T, F, J, S>(&self, mut op: F, mut jitter: J, mut sleep: S) -> Result<T>
    where
        F: FnMut() -> Result<T>,
        J: FnMut(Duration, Duration) -> Duration,
        S: FnMut(Duration),
    {
        let attempts = self.attempts.max(1);
        let mut last: Option<CovmatError> = None;
        for attempt in 1..=attempts {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) => {
                    log::warn!("read attempt {}/{} failed: {}", attempt, attempts, err);
                    if attempt < attempts {
                        sleep(jitter(self.min_delay, self.max_delay));
                    }
                    last = Some(err);
                }
            }
        }
        Err(CovmatError::RetriesExhausted {
            attempts,
            last: last.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn transient(msg: &str) -> CovmatError {
        CovmatError::Read {
            path: "remote.bw".to_string(),
            message: msg.to_string(),
        }
    }

    fn fixed_jitter(lo: Duration, _hi: Duration) -> Duration {
        lo
    }

    #[test]
    fn first_attempt_success_does_not_sleep() {
        let sleeps = RefCell::new(Vec::new());
        let policy = RetryPolicy::default();
        let result = policy.run_with(
            || Ok(7),
            fixed_jitter,
            |d| sleeps.borrow_mut().push(d),
        );
        assert_eq!(result.unwrap(), 7);
        assert!(sleeps.borrow().is_empty());
    }

    #[test]
    fn recovers_after_transient_failures() {
        let mut calls = 0;
        let sleeps = RefCell::new(Vec::new());
        let policy = RetryPolicy::default();
        let result = policy.run_with(
            || {
                calls += 1;
                if calls < 2 {
                    Err(transient("connection reset"))
                } else {
                    Ok(42)
                }
            },
            fixed_jitter,
            |d| sleeps.borrow_mut().push(d),
        );
        // Same value as a source that never fails.
        assert_eq!(result.unwrap(), 42);
        assert_eq!(sleeps.borrow().len(), 1);
    }

    #[test]
    fn exhaustion_carries_the_last_cause() {
        let policy = RetryPolicy::default();
        let sleeps = RefCell::new(Vec::new());
        let result: Result<()> = policy.run_with(
            || Err(transient("timed out")),
            fixed_jitter,
            |d| sleeps.borrow_mut().push(d),
        );
        let err = result.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("3"), "attempt count in: {}", message);
        assert!(message.contains("timed out"), "cause in: {}", message);
        // Two sleeps for three attempts; no sleep after the last one.
        assert_eq!(sleeps.borrow().len(), 2);
    }

    #[test]
    fn jitter_window_matches_the_policy() {
        let policy = RetryPolicy::default();
        let windows = RefCell::new(Vec::new());
        let _: Result<()> = policy.run_with(
            || Err(transient("flaky")),
            |lo, hi| {
                windows.borrow_mut().push((lo, hi));
                lo
            },
            |_| {},
        );
        for (lo, hi) in windows.borrow().iter() {
            assert_eq!(*lo, Duration::from_secs(2));
            assert_eq!(*hi, Duration::from_secs(5));
        }
    }

    #[test]
    fn configuration_errors_are_not_retried() {
        let mut calls = 0;
        let policy = RetryPolicy::default();
        let result: Result<()> = policy.run_with(
            || {
                calls += 1;
                Err(CovmatError::UnknownChromosome {
                    name: "chrX".to_string(),
                    valid: vec!["chr1".to_string()],
                })
            },
            fixed_jitter,
            |_| {},
        );
        assert!(matches!(
            result.unwrap_err(),
            CovmatError::UnknownChromosome { .. }
        ));
        assert_eq!(calls, 1);
    }
}
