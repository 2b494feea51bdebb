//! Streamed results
//!
//! A streamed response fails in two different places: while it is being set
//! up, before the first element arrives, and while it is being consumed.
//! [`prime`] pulls the first element eagerly so the first kind surfaces as an
//! ordinary failure the retry loop can act on. Failures after that belong to
//! the consumer and are passed through untouched.

use crate::failure::Failure;

/// A sequence whose first element has already been pulled
///
/// Yields the buffered first element, then everything the source yields,
/// in order and unmodified.
pub struct Primed<I: Iterator> {
    first: Option<I::Item>,
    rest: I,
}

impl<I: Iterator> Primed<I> {
    /// The buffered first element, if the source was not empty
    pub fn peek(&self) -> Option<&I::Item> {
        self.first.as_ref()
    }
}

impl<I: Iterator> Iterator for Primed<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        match self.first.take() {
            Some(first) => Some(first),
            None => self.rest.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let buffered = usize::from(self.first.is_some());
        let (lower, upper) = self.rest.size_hint();
        (
            lower.saturating_add(buffered),
            upper.and_then(|upper| upper.checked_add(buffered)),
        )
    }
}

/// Pull the first element of `source`, surfacing a failure there as `Err`
///
/// A source that ends without producing anything is not a failure; the
/// returned sequence is simply empty. An empty stream is therefore never
/// retried and never reaches the classifier, unlike a runtime where running
/// out of elements is itself raised as an error. Callers that treat an empty
/// response as a fault should yield an `Err` item for it from the source.
pub fn prime<S, T, E>(source: S) -> Result<Primed<S::IntoIter>, Failure<E>>
where
    S: IntoIterator<Item = Result<T, Failure<E>>>,
{
    let mut rest = source.into_iter();
    let first = match rest.next() {
        Some(Err(failure)) => return Err(failure),
        first => first,
    };

    Ok(Primed { first, rest })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    type Item = Result<u32, Failure<&'static str>>;

    #[test]
    fn test_prime_surfaces_setup_failure() {
        let source: Vec<Item> = vec![Err(Failure::new("handshake")), Ok(1)];

        let err = prime(source).err().expect("first element failure surfaces");
        assert_eq!(*err.error(), "handshake");
    }

    #[test]
    fn test_primed_yields_all_elements() {
        let source: Vec<Item> = vec![Ok(1), Ok(2), Ok(3)];

        let primed = prime(source).unwrap();
        assert_eq!(primed.size_hint(), (3, Some(3)));

        let values: Vec<u32> = primed.map(Result::unwrap).collect();
        assert_eq!(values, [1, 2, 3]);
    }

    #[test]
    fn test_primed_passes_later_failure_through() {
        let source: Vec<Item> = vec![Ok(1), Err(Failure::new("dropped")), Ok(2)];

        let mut primed = prime(source).unwrap();
        assert_eq!(primed.next().unwrap().unwrap(), 1);

        let failure = primed.next().unwrap().unwrap_err();
        assert_eq!(*failure.error(), "dropped");
        assert!(failure.cause().is_none());
        assert_eq!(primed.next().unwrap().unwrap(), 2);
    }

    #[test]
    fn test_prime_pulls_exactly_one_element() {
        let pulled = Cell::new(0);
        let source = (1..=5).map(|n| {
            pulled.set(pulled.get() + 1);
            Ok::<_, Failure<()>>(n)
        });

        let mut primed = prime(source).unwrap();
        assert_eq!(pulled.get(), 1);
        assert_eq!(primed.peek().map(|r| *r.as_ref().unwrap()), Some(1));

        primed.next();
        assert_eq!(pulled.get(), 1);
        primed.next();
        assert_eq!(pulled.get(), 2);
    }

    #[test]
    fn test_prime_empty_source() {
        let mut primed = prime(Vec::<Item>::new()).unwrap();
        assert!(primed.peek().is_none());
        assert!(primed.next().is_none());
    }
}
