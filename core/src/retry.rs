//! Retry mechanism with fluent builder API
//!
//! This module wraps fallible operations with automatic retries. Every
//! failure is linked to the one before it, so the error that finally surfaces
//! carries the whole attempt history.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::RetryPolicy;
use crate::failure::Failure;
use crate::sleep::{Sleeper, StdSleeper};
use crate::stream::{Primed, prime};

/// Extension trait that adds `.retry()` to closures and functions
///
/// Implemented for every `FnMut` returning `Result<T, Failure<E>>`.
///
/// # Example
///
/// ```rust
/// use second_wind::{Failure, RetryPolicy, Retryable};
///
/// fn complete() -> Result<String, Failure<std::io::Error>> {
///     // ... call the provider
/// #   Ok("done".to_string())
/// }
///
/// let result = complete.retry(RetryPolicy::default()).call();
/// # assert!(result.is_ok());
/// ```
pub trait Retryable<T, E> {
    /// Begin building a retry operation with the given policy
    fn retry(self, policy: RetryPolicy) -> RetryBuilder<Self, T, E, fn(&Failure<E>) -> bool>
    where
        Self: Sized;
}

impl<F, T, E> Retryable<T, E> for F
where
    F: FnMut() -> Result<T, Failure<E>>,
{
    fn retry(self, policy: RetryPolicy) -> RetryBuilder<Self, T, E, fn(&Failure<E>) -> bool> {
        RetryBuilder {
            operation: self,
            policy,
            when: None,
            notify: None,
            _phantom_t: std::marker::PhantomData,
        }
    }
}

/// A retry decision, passed to the [`RetryBuilder::notify`] callback
#[derive(Debug)]
pub struct RetryEvent<'a, E> {
    /// 1-based number of the attempt that just failed
    pub attempt: u32,
    /// Retries allowed by the policy
    pub max_retries: u32,
    /// How long the loop will sleep before the next attempt
    pub delay: Duration,
    /// The failure, already linked to the ones before it
    pub failure: &'a Failure<E>,
}

/// Builder for configuring and executing retry operations
///
/// Created by calling `.retry()` on a function or closure.
///
/// # Type Parameters
///
/// * `F` - The operation function type
/// * `T` - The success return type
/// * `E` - The error type wrapped by [`Failure`]
/// * `W` - The when predicate type
pub struct RetryBuilder<F, T, E, W> {
    operation: F,
    policy: RetryPolicy,
    when: Option<W>,
    notify: Option<fn(&RetryEvent<'_, E>)>,
    _phantom_t: std::marker::PhantomData<T>,
}

impl<F, T, E, W> RetryBuilder<F, T, E, W>
where
    F: FnMut() -> Result<T, Failure<E>>,
    W: Fn(&Failure<E>) -> bool,
    E: fmt::Display,
{
    /// Only retry failures for which `predicate` returns `true`
    ///
    /// The predicate sees each failure after it has been linked to the
    /// previous ones. Without a predicate every failure is retried until the
    /// policy's bound is reached.
    ///
    /// # Example
    ///
    /// ```rust
    /// use second_wind::{Failure, ProviderError, RetryPolicy, Retryable, classify};
    /// use second_wind::sleep::FnSleeper;
    ///
    /// let result: Result<(), _> = (|| {
    ///     Err(Failure::new(ProviderError::Status {
    ///         status: 401,
    ///         message: "bad key".into(),
    ///     }))
    /// })
    /// .retry(RetryPolicy::default())
    /// .when(classify::should_retry)
    /// .call_with_sleeper(FnSleeper(|_| panic!("never retried")));
    ///
    /// assert!(result.is_err());
    /// ```
    pub fn when<P>(self, predicate: P) -> RetryBuilder<F, T, E, P>
    where
        P: Fn(&Failure<E>) -> bool,
    {
        RetryBuilder {
            operation: self.operation,
            policy: self.policy,
            when: Some(predicate),
            notify: self.notify,
            _phantom_t: std::marker::PhantomData,
        }
    }

    /// Add a callback invoked before each retry sleep
    pub fn notify(mut self, callback: fn(&RetryEvent<'_, E>)) -> Self {
        self.notify = Some(callback);
        self
    }

    /// Execute with blocking `std::thread::sleep` between attempts
    ///
    /// Returns the first success, or the final failure with every earlier
    /// failure reachable through [`Failure::chain`].
    pub fn call(self) -> Result<T, Failure<E>> {
        self.call_with_sleeper(StdSleeper)
    }

    /// Execute with a custom sleeper
    pub fn call_with_sleeper<S: Sleeper>(self, sleeper: S) -> Result<T, Failure<E>> {
        let mut rng = SmallRng::from_os_rng();
        self.call_with(sleeper, &mut rng)
    }

    /// Execute with a custom sleeper and jitter source
    pub fn call_with<S: Sleeper, R: Rng>(self, sleeper: S, rng: &mut R) -> Result<T, Failure<E>> {
        let RetryBuilder {
            mut operation,
            policy,
            when,
            notify,
            ..
        } = self;

        let settings = Settings {
            policy,
            when,
            notify,
        };
        settings.run(&mut operation, &sleeper, rng)
    }

    /// Execute an operation whose success is a stream of results
    ///
    /// The first element is pulled eagerly, so a failure before anything has
    /// been produced is retried like any other. Once the first element is in
    /// hand the stream is returned, and failures it yields later go straight
    /// to the consumer: they are neither retried nor linked.
    ///
    /// # Example
    ///
    /// ```rust
    /// use second_wind::{Failure, RetryPolicy, Retryable};
    /// use second_wind::sleep::FnSleeper;
    ///
    /// let mut calls = 0;
    /// let tokens = (|| {
    ///     calls += 1;
    ///     let first = if calls == 1 {
    ///         Err(Failure::new("stream reset"))
    ///     } else {
    ///         Ok("Hello")
    ///     };
    ///     Ok::<_, Failure<&str>>(vec![first, Ok(", world")])
    /// })
    /// .retry(RetryPolicy::default())
    /// .call_streaming_with_sleeper(FnSleeper(|_| {}))
    /// .unwrap();
    ///
    /// let text: String = tokens.map(Result::unwrap).collect();
    /// assert_eq!(text, "Hello, world");
    /// assert_eq!(calls, 2);
    /// ```
    pub fn call_streaming<U>(self) -> Result<Primed<T::IntoIter>, Failure<E>>
    where
        T: IntoIterator<Item = Result<U, Failure<E>>>,
    {
        self.call_streaming_with_sleeper(StdSleeper)
    }

    /// Streaming execution with a custom sleeper
    pub fn call_streaming_with_sleeper<U, S: Sleeper>(
        self,
        sleeper: S,
    ) -> Result<Primed<T::IntoIter>, Failure<E>>
    where
        T: IntoIterator<Item = Result<U, Failure<E>>>,
    {
        let mut rng = SmallRng::from_os_rng();
        self.call_streaming_with(sleeper, &mut rng)
    }

    /// Streaming execution with a custom sleeper and jitter source
    pub fn call_streaming_with<U, S: Sleeper, R: Rng>(
        self,
        sleeper: S,
        rng: &mut R,
    ) -> Result<Primed<T::IntoIter>, Failure<E>>
    where
        T: IntoIterator<Item = Result<U, Failure<E>>>,
    {
        let RetryBuilder {
            mut operation,
            policy,
            when,
            notify,
            ..
        } = self;

        let settings = Settings {
            policy,
            when,
            notify,
        };
        settings.run(&mut || operation().and_then(prime), &sleeper, rng)
    }
}

struct Settings<E, W> {
    policy: RetryPolicy,
    when: Option<W>,
    notify: Option<fn(&RetryEvent<'_, E>)>,
}

impl<E, W> Settings<E, W>
where
    W: Fn(&Failure<E>) -> bool,
    E: fmt::Display,
{
    fn should_retry(&self, failure: &Failure<E>) -> bool {
        self.when.as_ref().is_none_or(|predicate| predicate(failure))
    }

    fn run<T, A, S, R>(&self, attempt: &mut A, sleeper: &S, rng: &mut R) -> Result<T, Failure<E>>
    where
        A: FnMut() -> Result<T, Failure<E>>,
        S: Sleeper,
        R: Rng,
    {
        let max_retries = self.policy.max_retries();
        let mut previous: Option<Failure<E>> = None;
        let mut idx = 0u32;

        loop {
            let failure = match attempt() {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            let failure = match previous.take() {
                Some(previous) => failure.link(previous),
                None => failure,
            };

            if !self.should_retry(&failure) {
                debug!(attempt = idx + 1, error = %failure, "failure is not retryable");
                return Err(failure);
            }

            if idx >= max_retries {
                debug!(attempt = idx + 1, max_retries, error = %failure, "retries exhausted");
                return Err(failure);
            }

            let delay = self.policy.calculate_delay_with(&failure, idx, Utc::now(), rng);
            warn!(
                attempt = idx + 1,
                max_retries,
                delay_secs = delay.as_secs_f64(),
                error = %failure,
                "[{}/{}] captured error, retrying in {:.3}s",
                idx + 1,
                max_retries,
                delay.as_secs_f64(),
            );

            if let Some(notify) = self.notify {
                notify(&RetryEvent {
                    attempt: idx + 1,
                    max_retries,
                    delay,
                    failure: &failure,
                });
            }

            sleeper.sleep(delay);
            previous = Some(failure);
            idx += 1;
        }
    }
}
