//! Failures and their cause chains
//!
//! A [`Failure`] wraps the error produced by one attempt together with the
//! response metadata that came with it. Failures that belong to the same retry
//! sequence are linked through their `cause`, newest first, so the failure that
//! finally surfaces carries the history of every attempt before it.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

const RETRY_AFTER: &str = "retry-after";
const SHOULD_RETRY: &str = "x-should-retry";

/// Response metadata attached to a failure
///
/// Header names are case-insensitive; they are stored lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    headers: BTreeMap<String, String>,
}

impl Metadata {
    /// Create empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header, replacing any previous value under the same name
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert a header, returning the previous value if one existed
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into())
    }

    /// Look up a header by name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Raw `retry-after` value, if the server sent one
    pub fn retry_after(&self) -> Option<&str> {
        self.header(RETRY_AFTER)
    }

    /// Explicit `x-should-retry` directive from the server
    ///
    /// Only the exact values `"true"` and `"false"` count; anything else is
    /// treated as absent.
    pub fn should_retry(&self) -> Option<bool> {
        match self.header(SHOULD_RETRY)? {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    /// Returns `true` if no headers are present
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Metadata
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Metadata::new();
        for (name, value) in iter {
            metadata.insert(name, value);
        }
        metadata
    }
}

/// The outcome of an unsuccessful attempt
///
/// # Example
///
/// ```rust
/// use second_wind::Failure;
///
/// let first = Failure::new("connection reset");
/// let second = Failure::new("timed out").link(first);
///
/// let history: Vec<_> = second.chain().map(|f| *f.error()).collect();
/// assert_eq!(history, ["timed out", "connection reset"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Failure<E> {
    error: E,
    metadata: Metadata,
    cause: Option<Box<Failure<E>>>,
}

impl<E> Failure<E> {
    /// Wrap an error with no metadata and no cause
    pub fn new(error: E) -> Self {
        Self {
            error,
            metadata: Metadata::new(),
            cause: None,
        }
    }

    /// Attach response metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Attach a single response header
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.metadata.insert(name, value);
        self
    }

    /// The underlying error
    pub fn error(&self) -> &E {
        &self.error
    }

    /// Consume the failure, discarding metadata and history
    pub fn into_error(self) -> E {
        self.error
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The failure that preceded this one
    pub fn cause(&self) -> Option<&Failure<E>> {
        self.cause.as_deref()
    }

    /// Iterate over this failure and every cause behind it, newest first
    pub fn chain(&self) -> Chain<'_, E> {
        Chain { next: Some(self) }
    }

    /// Thread `previous` onto the end of this failure's cause chain
    ///
    /// Causes already present on `self` are kept in place; `previous` is
    /// attached behind the deepest of them. The chain is rebuilt by value, so
    /// no failure is ever mutated through a shared reference.
    pub fn link(self, previous: Failure<E>) -> Failure<E> {
        let cause = match self.cause {
            Some(own) => own.link(previous),
            None => previous,
        };

        Failure {
            error: self.error,
            metadata: self.metadata,
            cause: Some(Box::new(cause)),
        }
    }
}

impl<E> From<E> for Failure<E> {
    fn from(error: E) -> Self {
        Failure::new(error)
    }
}

impl<E: fmt::Display> fmt::Display for Failure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<E> Error for Failure<E>
where
    E: Error + 'static,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn Error + 'static))
    }
}

/// Iterator over a failure's cause chain, created by [`Failure::chain`]
#[derive(Debug)]
pub struct Chain<'a, E> {
    next: Option<&'a Failure<E>>,
}

impl<'a, E> Iterator for Chain<'a, E> {
    type Item = &'a Failure<E>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.cause();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors(failure: &Failure<&'static str>) -> Vec<&'static str> {
        failure.chain().map(|f| *f.error()).collect()
    }

    #[test]
    fn test_header_names_are_case_insensitive() {
        let metadata = Metadata::new().with_header("Retry-After", "30");

        assert_eq!(metadata.header("retry-after"), Some("30"));
        assert_eq!(metadata.header("RETRY-AFTER"), Some("30"));
        assert_eq!(metadata.retry_after(), Some("30"));
    }

    #[test]
    fn test_should_retry_header() {
        let yes = Metadata::new().with_header("x-should-retry", "true");
        let no = Metadata::new().with_header("x-should-retry", "false");
        let junk = Metadata::new().with_header("x-should-retry", "maybe");

        assert_eq!(yes.should_retry(), Some(true));
        assert_eq!(no.should_retry(), Some(false));
        assert_eq!(junk.should_retry(), None);
        assert_eq!(Metadata::new().should_retry(), None);
    }

    #[test]
    fn test_metadata_from_iter() {
        let metadata: Metadata = [("Content-Type", "json"), ("retry-after", "5")]
            .into_iter()
            .collect();

        assert_eq!(metadata.header("content-type"), Some("json"));
        assert_eq!(metadata.retry_after(), Some("5"));
    }

    #[test]
    fn test_link_visits_failures_newest_first() {
        let chain = ["first", "second", "third", "fourth"]
            .into_iter()
            .map(Failure::new)
            .fold(None, |previous: Option<Failure<_>>, next| {
                Some(match previous {
                    Some(previous) => next.link(previous),
                    None => next,
                })
            })
            .unwrap();

        assert_eq!(errors(&chain), ["fourth", "third", "second", "first"]);
    }

    #[test]
    fn test_link_preserves_existing_cause() {
        let previous = Failure::new("previous attempt");
        let current = Failure::new("current").link(Failure::new("underlying io"));

        let linked = current.link(previous);

        assert_eq!(errors(&linked), ["current", "underlying io", "previous attempt"]);
    }

    #[test]
    fn test_own_cause_of_first_failure_is_deepest() {
        let first = Failure::new("first").link(Failure::new("root"));
        let second = Failure::new("second").link(first);

        assert_eq!(errors(&second), ["second", "first", "root"]);
        assert_eq!(second.chain().last().map(|f| *f.error()), Some("root"));
    }

    #[test]
    fn test_link_keeps_metadata() {
        let linked = Failure::new("current")
            .with_header("retry-after", "3")
            .link(Failure::new("previous"));

        assert_eq!(linked.metadata().retry_after(), Some("3"));
        assert!(linked.cause().unwrap().metadata().is_empty());
    }

    #[test]
    fn test_error_source_walks_chain() {
        let io = |msg: &str| std::io::Error::other(msg.to_string());
        let linked = Failure::new(io("second")).link(Failure::new(io("first")));

        let source = linked.source().expect("linked failure has a source");
        assert_eq!(source.to_string(), "first");
        assert!(source.source().is_none());
    }
}
