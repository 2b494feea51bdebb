//! Sleep abstraction
//!
//! The retry loop blocks the calling thread between attempts. Sleeping goes
//! through [`Sleeper`] so tests and embedders can observe or replace it.

use std::time::Duration;

/// Trait for sleep/delay implementations
pub trait Sleeper {
    /// Block for the given duration
    fn sleep(&self, duration: Duration);
}

/// Standard library sleeper using `std::thread::sleep`
///
/// # Example
///
/// ```rust
/// use second_wind::sleep::{Sleeper, StdSleeper};
/// use std::time::Duration;
///
/// StdSleeper.sleep(Duration::from_millis(1));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct StdSleeper;

impl Sleeper for StdSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Closure sleeper for custom sleep implementations
///
/// Useful in tests to record requested delays instead of waiting.
///
/// # Example
///
/// ```rust
/// use second_wind::sleep::{FnSleeper, Sleeper};
/// use std::cell::RefCell;
/// use std::time::Duration;
///
/// let slept = RefCell::new(Vec::new());
/// let sleeper = FnSleeper(|d: Duration| slept.borrow_mut().push(d));
/// sleeper.sleep(Duration::from_secs(2));
///
/// assert_eq!(slept.into_inner(), [Duration::from_secs(2)]);
/// ```
#[derive(Clone, Copy)]
pub struct FnSleeper<F>(pub F);

impl<F> Sleeper for FnSleeper<F>
where
    F: Fn(Duration),
{
    fn sleep(&self, duration: Duration) {
        (self.0)(duration);
    }
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}
