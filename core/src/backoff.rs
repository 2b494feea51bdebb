//! Retry delay calculation
//!
//! A server-provided `retry-after` hint wins when it is reasonable; otherwise
//! the delay is exponential backoff capped at a maximum, scaled by a random
//! jitter factor in `(0.75, 1.0]`.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use rand::Rng;

use crate::failure::{Failure, Metadata};

/// Longest `retry-after` hint, in seconds, that is obeyed verbatim
pub const MAX_RETRY_AFTER_SECS: i64 = 60;

/// Maximum share of the backoff that jitter may remove
const JITTER_SPREAD: f64 = 0.25;

/// RFC 850 and asctime layouts, both always in GMT
const OBSOLETE_HTTP_DATE_FORMATS: [&str; 2] =
    ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"];

/// Parse a `retry-after` header value into a signed count of seconds
///
/// Accepts either an integer number of seconds or an HTTP date in any of its
/// three forms (IMF-fixdate, RFC 850, asctime), which is converted to the
/// number of whole seconds between `now` and that date (negative when the
/// date is in the past). Returns `None` if neither form
/// parses.
///
/// # Example
///
/// ```rust
/// use chrono::{DateTime, NaiveDateTime, Utc};
/// use second_wind::backoff::parse_retry_after;
///
/// let now: DateTime<Utc> = DateTime::parse_from_rfc2822("Wed, 21 Oct 2015 07:27:00 GMT")
///     .unwrap()
///     .into();
///
/// assert_eq!(parse_retry_after("30", now), Some(30));
/// assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT", now), Some(60));
/// assert_eq!(parse_retry_after("soon", now), None);
/// ```
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<i64> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<i64>() {
        return Some(seconds);
    }

    let date = parse_http_date(value)?;
    Some((date - now).num_seconds())
}

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }

    // asctime pads single-digit days with a space
    let normalized = value.split_whitespace().collect::<Vec<_>>().join(" ");
    OBSOLETE_HTTP_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&normalized, format).ok())
        .map(|naive| naive.and_utc())
}

/// The server's `retry-after` hint, if present and within `(0, 60]` seconds
pub fn retry_after_hint(metadata: &Metadata, now: DateTime<Utc>) -> Option<Duration> {
    let seconds = parse_retry_after(metadata.retry_after()?, now)?;
    if (1..=MAX_RETRY_AFTER_SECS).contains(&seconds) {
        u64::try_from(seconds).ok().map(Duration::from_secs)
    } else {
        None
    }
}

/// Jittered exponential backoff for a 0-indexed attempt
///
/// The base delay is `initial * 2^attempt`, capped at `max`, then multiplied
/// by `1 - 0.25 * U` with `U` drawn uniformly from `[0, 1)`.
pub fn exponential_backoff<R: Rng>(
    attempt: u32,
    initial: Duration,
    max: Duration,
    rng: &mut R,
) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let base = (initial.as_secs_f64() * 2f64.powi(exponent)).min(max.as_secs_f64());

    let jitter = 1.0 - JITTER_SPREAD * rng.random::<f64>();
    let delay = base * jitter;

    if delay.is_finite() && delay > 0.0 {
        Duration::from_secs_f64(delay)
    } else {
        Duration::ZERO
    }
}

/// How long to wait after `failure` before attempt `attempt + 1`
pub fn retry_delay<E, R: Rng>(
    failure: &Failure<E>,
    attempt: u32,
    initial: Duration,
    max: Duration,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Duration {
    retry_after_hint(failure.metadata(), now)
        .unwrap_or_else(|| exponential_backoff(attempt, initial, max, rng))
}
