//! Second Wind - retry-with-backoff for calls to LLM provider APIs
//!
//! This crate decides whether a failed remote call should be retried, how long
//! to wait before retrying, and keeps every failed attempt reachable from the
//! error that finally surfaces.
//!
//! # Features
//!
//! - **Cause chains**: each [`Failure`] links to the attempt before it
//! - **Retry-After aware**: a reasonable server hint overrides computed backoff
//! - **Jittered exponential backoff**: `min(initial * 2^n, max) * (0.75, 1.0]`
//! - **Streamed results**: setup failures of a stream are retried, later ones
//!   reach the consumer untouched
//! - **Fallback chains**: try alternative operations in order
//!
//! # Example
//!
//! ```rust
//! use second_wind::{Failure, ProviderError, RetryPolicy, Retryable, classify};
//! use second_wind::sleep::FnSleeper;
//!
//! let mut calls = 0;
//! let result = (|| {
//!     calls += 1;
//!     if calls < 3 {
//!         Err(Failure::new(ProviderError::Timeout))
//!     } else {
//!         Ok("completion")
//!     }
//! })
//! .retry(RetryPolicy::default())
//! .when(classify::should_retry)
//! .call_with_sleeper(FnSleeper(|_| {}));
//!
//! assert_eq!(result, Ok("completion"));
//! ```

use std::num::NonZeroU32;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

pub mod backoff;
pub mod classify;
pub mod error;
pub mod failure;
pub mod fallback;
pub mod retry;
pub mod sleep;
pub mod stream;

pub use classify::{Categorize, FailureCategory};
pub use error::{PolicyError, ProviderError};
pub use failure::{Chain, Failure, Metadata};
pub use fallback::{FallbackChain, Operation};
pub use retry::{RetryBuilder, RetryEvent, Retryable};
pub use sleep::{FnSleeper, Sleeper, StdSleeper};
pub use stream::{Primed, prime};

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: NonZeroU32 = match NonZeroU32::new(10) {
    Some(retries) => retries,
    None => unreachable!(),
};

/// Default delay before the first retry
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(500);

/// Default cap on the computed backoff
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);

/// Retry policy configuration
///
/// Bounds the number of retries and shapes the backoff between them. A policy
/// can only be built in a valid state: at least one retry, a non-zero initial
/// delay, and a maximum delay no shorter than the initial one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: NonZeroU32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy, validating every field
    ///
    /// # Example
    ///
    /// ```rust
    /// use second_wind::{PolicyError, RetryPolicy};
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::new(3, Duration::from_millis(100), Duration::from_secs(2))?;
    /// assert_eq!(policy.max_retries(), 3);
    ///
    /// let err = RetryPolicy::new(0, Duration::from_millis(100), Duration::from_secs(2));
    /// assert_eq!(err, Err(PolicyError::ZeroRetries));
    /// # Ok::<(), PolicyError>(())
    /// ```
    pub fn new(
        max_retries: u32,
        initial_delay: Duration,
        max_delay: Duration,
    ) -> Result<Self, PolicyError> {
        Self::default()
            .with_max_retries(max_retries)?
            .with_delays(initial_delay, max_delay)
    }

    /// Replace the retry bound
    pub fn with_max_retries(mut self, max_retries: u32) -> Result<Self, PolicyError> {
        self.max_retries = NonZeroU32::new(max_retries).ok_or(PolicyError::ZeroRetries)?;
        Ok(self)
    }

    /// Replace the initial and maximum delays together
    pub fn with_delays(
        mut self,
        initial_delay: Duration,
        max_delay: Duration,
    ) -> Result<Self, PolicyError> {
        if initial_delay.is_zero() {
            return Err(PolicyError::ZeroInitialDelay);
        }
        if max_delay < initial_delay {
            return Err(PolicyError::MaxBelowInitial {
                initial: initial_delay,
                max: max_delay,
            });
        }

        self.initial_delay = initial_delay;
        self.max_delay = max_delay;
        Ok(self)
    }

    /// Retries allowed after the first attempt
    pub fn max_retries(&self) -> u32 {
        self.max_retries.get()
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Calculate the wait after `failure` on the 0-indexed `attempt`
    ///
    /// Uses the current time for date-form `retry-after` hints and a freshly
    /// seeded RNG for jitter.
    pub fn calculate_delay<E>(&self, failure: &Failure<E>, attempt: u32) -> Duration {
        let mut rng = SmallRng::from_os_rng();
        self.calculate_delay_with(failure, attempt, Utc::now(), &mut rng)
    }

    /// Calculate the wait with an explicit clock reading and RNG
    pub fn calculate_delay_with<E, R: Rng>(
        &self,
        failure: &Failure<E>,
        attempt: u32,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Duration {
        backoff::retry_delay(
            failure,
            attempt,
            self.initial_delay,
            self.max_delay,
            now,
            rng,
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(DEFAULT_MAX_RETRIES.get(), 10);
        assert_eq!(policy.max_retries(), 10);
        assert_eq!(policy.initial_delay(), Duration::from_millis(500));
        assert_eq!(policy.max_delay(), Duration::from_secs(8));
    }

    #[test]
    fn test_policy_validation() {
        let second = Duration::from_secs(1);

        assert_eq!(
            RetryPolicy::new(0, second, second),
            Err(PolicyError::ZeroRetries)
        );
        assert_eq!(
            RetryPolicy::new(3, Duration::ZERO, second),
            Err(PolicyError::ZeroInitialDelay)
        );
        assert_eq!(
            RetryPolicy::new(3, second * 2, second),
            Err(PolicyError::MaxBelowInitial {
                initial: second * 2,
                max: second,
            })
        );

        let equal = RetryPolicy::new(1, second, second).unwrap();
        assert_eq!(equal.max_retries(), 1);
        assert_eq!(equal.max_delay(), second);
    }

    #[test]
    fn test_with_setters_keep_other_fields() {
        let policy = RetryPolicy::default().with_max_retries(4).unwrap();
        assert_eq!(policy.max_retries(), 4);
        assert_eq!(policy.initial_delay(), DEFAULT_INITIAL_DELAY);

        let policy = policy
            .with_delays(Duration::from_secs(10), Duration::from_secs(20))
            .unwrap();
        assert_eq!(policy.max_retries(), 4);
        assert_eq!(policy.initial_delay(), Duration::from_secs(10));

        assert!(policy.with_max_retries(0).is_err());
    }

    #[test]
    fn test_calculate_delay_within_bounds() {
        let policy = RetryPolicy::default();
        let failure = Failure::new(());

        for attempt in 0..8 {
            let ceiling = DEFAULT_INITIAL_DELAY
                .saturating_mul(1 << attempt)
                .min(DEFAULT_MAX_DELAY);
            assert!(policy.calculate_delay(&failure, attempt) <= ceiling);
        }
    }

    #[test]
    fn test_calculate_delay_honors_retry_after() {
        let policy = RetryPolicy::default();
        let failure = Failure::new(()).with_header("Retry-After", "30");

        assert_eq!(policy.calculate_delay(&failure, 0), Duration::from_secs(30));
    }
}
