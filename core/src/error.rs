//! Error types owned by this crate

use std::time::Duration;

use thiserror::Error;

use crate::classify::{Categorize, FailureCategory};

/// Rejected [`RetryPolicy`](crate::RetryPolicy) configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("max_retries must be greater than zero")]
    ZeroRetries,

    #[error("initial delay must be greater than zero")]
    ZeroInitialDelay,

    #[error("max delay {max:?} is shorter than initial delay {initial:?}")]
    MaxBelowInitial { initial: Duration, max: Duration },
}

/// A provider-agnostic remote call error
///
/// Integrations that do not need their own error type can map into this one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("{0}")]
    Other(String),
}

impl Categorize for ProviderError {
    fn category(&self) -> FailureCategory {
        match self {
            ProviderError::Timeout => FailureCategory::Timeout,
            ProviderError::Connection(_) => FailureCategory::Connection,
            ProviderError::Status { status, .. } => FailureCategory::from_status(*status),
            ProviderError::Other(_) => FailureCategory::Other,
        }
    }

    fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
