//! Ordered fallback across alternative operations
//!
//! A [`FallbackChain`] tries each operation once, in order, and returns the
//! first success. Failures are linked as they happen, so when every
//! operation fails the last failure carries all of the others.

use std::fmt;

use tracing::warn;

use crate::failure::Failure;

/// A boxed zero-argument operation
pub type Operation<'a, T, E> = Box<dyn FnOnce() -> Result<T, Failure<E>> + 'a>;

/// A non-empty, ordered list of alternative operations
///
/// # Example
///
/// ```rust
/// use second_wind::{Failure, FallbackChain};
///
/// let answer = FallbackChain::new(|| Err(Failure::new("primary model overloaded")))
///     .or_try(|| Err(Failure::new("secondary region down")))
///     .or_try(|| Ok("answer from the backup provider"))
///     .try_all();
///
/// assert_eq!(answer, Ok("answer from the backup provider"));
/// ```
pub struct FallbackChain<'a, T, E> {
    first: Operation<'a, T, E>,
    rest: Vec<Operation<'a, T, E>>,
}

impl<'a, T, E> FallbackChain<'a, T, E> {
    /// Start a chain with its first operation
    pub fn new<F>(first: F) -> Self
    where
        F: FnOnce() -> Result<T, Failure<E>> + 'a,
    {
        Self {
            first: Box::new(first),
            rest: Vec::new(),
        }
    }

    /// Append an operation to try if everything before it fails
    pub fn or_try<F>(mut self, next: F) -> Self
    where
        F: FnOnce() -> Result<T, Failure<E>> + 'a,
    {
        self.rest.push(Box::new(next));
        self
    }

    /// Run the operations in order and return the first success
    ///
    /// Operations after the first success are never invoked. If all of them
    /// fail, the last failure is returned with the earlier ones linked behind
    /// it; a chain of one operation returns that operation's failure as is.
    pub fn try_all(self) -> Result<T, Failure<E>>
    where
        E: fmt::Display,
    {
        let total = self.rest.len() + 1;
        let mut failure = match (self.first)() {
            Ok(value) => return Ok(value),
            Err(failure) => failure,
        };

        for (offset, operation) in self.rest.into_iter().enumerate() {
            let position = offset + 2;
            warn!(
                position,
                total,
                error = %failure,
                "[{}/{}] trying next operation",
                position,
                total,
            );

            match operation() {
                Ok(value) => return Ok(value),
                Err(next) => failure = next.link(failure),
            }
        }

        Err(failure)
    }
}

impl<'a, T, E> Extend<Operation<'a, T, E>> for FallbackChain<'a, T, E> {
    fn extend<I: IntoIterator<Item = Operation<'a, T, E>>>(&mut self, iter: I) {
        self.rest.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tracing_test::traced_test;

    fn errors(failure: &Failure<&'static str>) -> Vec<&'static str> {
        failure.chain().map(|f| *f.error()).collect()
    }

    #[test]
    fn test_first_success_short_circuits() {
        let later_calls = Cell::new(0);

        let result = FallbackChain::new(|| Ok::<_, Failure<&str>>(1))
            .or_try(|| {
                later_calls.set(later_calls.get() + 1);
                Ok(2)
            })
            .or_try(|| {
                later_calls.set(later_calls.get() + 1);
                Ok(3)
            })
            .try_all();

        assert_eq!(result, Ok(1));
        assert_eq!(later_calls.get(), 0);
    }

    #[test]
    fn test_third_operation_succeeds() {
        let result = FallbackChain::new(|| Err(Failure::new("f1")))
            .or_try(|| Err(Failure::new("f2")))
            .or_try(|| Ok::<_, Failure<&str>>("f3 value"))
            .try_all();

        assert_eq!(result, Ok("f3 value"));
    }

    #[test]
    fn test_all_fail_links_in_order() {
        let result: Result<(), _> = FallbackChain::new(|| Err(Failure::new("f1")))
            .or_try(|| Err(Failure::new("f2")))
            .or_try(|| Err(Failure::new("f3")))
            .try_all();

        assert_eq!(errors(&result.unwrap_err()), ["f3", "f2", "f1"]);
    }

    #[test]
    fn test_single_failure_is_unmodified() {
        let original = Failure::new("only").with_header("retry-after", "5");
        let expected = original.clone();

        let result: Result<(), _> = FallbackChain::new(move || Err(original)).try_all();

        assert_eq!(result.unwrap_err(), expected);
    }

    #[test]
    fn test_extend_with_boxed_operations() {
        let mut chain = FallbackChain::new(|| Err(Failure::new("a")));
        chain.extend((0..3).map(|n| -> Operation<'static, u32, &'static str> {
            Box::new(move || if n == 2 { Ok(n) } else { Err(Failure::new("b")) })
        }));

        assert_eq!(chain.try_all(), Ok(2));
    }

    #[traced_test]
    #[test]
    fn test_logs_position() {
        let result = FallbackChain::new(|| Err(Failure::new("primary down")))
            .or_try(|| Ok::<_, Failure<&str>>(()))
            .try_all();

        assert!(result.is_ok());
        assert!(logs_contain("[2/2] trying next operation"));
        assert!(logs_contain("primary down"));
    }
}
