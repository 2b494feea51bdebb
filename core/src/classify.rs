//! Failure categories and stock retry classifiers
//!
//! Provider integrations map their own error types into the small closed set
//! of [`FailureCategory`] values by implementing [`Categorize`]. The retry
//! loop never looks at provider error types directly.

use crate::failure::Failure;

/// Generic classification of a remote call failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    /// The call did not complete in time
    Timeout,
    /// The connection could not be established or was dropped
    Connection,
    /// The service asked the caller to slow down (HTTP 429)
    RateLimited,
    /// Any other error status from the remote service
    ServerError,
    /// Bad request, authentication, permission or not found; never retried
    ClientError,
    /// Not a remote call failure at all
    Other,
}

impl FailureCategory {
    /// Map an HTTP status code into a category
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 401 | 403 | 404 => FailureCategory::ClientError,
            429 => FailureCategory::RateLimited,
            _ => FailureCategory::ServerError,
        }
    }

    /// Whether this category is transient by default
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FailureCategory::Timeout
                | FailureCategory::Connection
                | FailureCategory::RateLimited
                | FailureCategory::ServerError
        )
    }
}

/// Maps a provider-specific error into a [`FailureCategory`]
///
/// # Example
///
/// ```rust
/// use second_wind::{Categorize, FailureCategory};
///
/// enum VendorError {
///     Deadline,
///     Http(u16),
/// }
///
/// impl Categorize for VendorError {
///     fn category(&self) -> FailureCategory {
///         match self {
///             VendorError::Deadline => FailureCategory::Timeout,
///             VendorError::Http(status) => FailureCategory::from_status(*status),
///         }
///     }
///
///     fn status(&self) -> Option<u16> {
///         match self {
///             VendorError::Http(status) => Some(*status),
///             VendorError::Deadline => None,
///         }
///     }
/// }
///
/// assert_eq!(VendorError::Http(401).category(), FailureCategory::ClientError);
/// ```
pub trait Categorize {
    fn category(&self) -> FailureCategory;

    /// HTTP status of the failed response, when there was one
    fn status(&self) -> Option<u16> {
        None
    }
}

/// Default classifier for chat-completion style APIs
///
/// An explicit `x-should-retry` header from the server is obeyed. Otherwise
/// timeouts, connection errors, rate limiting and server errors are retried;
/// client errors and anything uncategorized are not.
pub fn should_retry<E: Categorize>(failure: &Failure<E>) -> bool {
    if let Some(directive) = failure.metadata().should_retry() {
        return directive;
    }

    failure.error().category().is_transient()
}

/// Strict classifier that only retries "service unavailable" style statuses
///
/// Retries 429, 500, 503 and 504 and nothing else; failures without a status
/// are never retried.
pub fn should_retry_unavailable<E: Categorize>(failure: &Failure<E>) -> bool {
    matches!(failure.error().status(), Some(429 | 500 | 503 | 504))
}
