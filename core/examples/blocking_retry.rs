//! Blocking retry example
//!
//! Demonstrates wrapping a flaky provider call with retries, a classifier,
//! and a fallback chain.
//!
//! Run with: cargo run --example blocking_retry

use std::cell::Cell;
use std::time::Duration;

use second_wind::{
    FallbackChain, Failure, ProviderError, RetryEvent, RetryPolicy, Retryable, classify,
};

fn status(status: u16, message: &str) -> ProviderError {
    ProviderError::Status {
        status,
        message: message.to_string(),
    }
}

fn report(event: &RetryEvent<'_, ProviderError>) {
    println!(
        "   -> attempt {}/{} failed ({}), waiting {:?}",
        event.attempt, event.max_retries, event.failure, event.delay
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let policy = RetryPolicy::new(4, Duration::from_millis(50), Duration::from_millis(400))?;

    println!("1. Transient failures, then success:");
    let attempts = Cell::new(0);
    let result = (|| {
        attempts.set(attempts.get() + 1);
        match attempts.get() {
            1 => Err(Failure::new(ProviderError::Timeout)),
            2 => Err(Failure::new(status(503, "overloaded"))),
            _ => Ok("The Dodgers won the 2020 World Series."),
        }
    })
    .retry(policy)
    .when(classify::should_retry)
    .notify(report)
    .call();
    println!("   Result: {:?}\n", result);

    println!("2. Rate limited with a Retry-After hint:");
    attempts.set(0);
    let result = (|| {
        attempts.set(attempts.get() + 1);
        if attempts.get() == 1 {
            Err(Failure::new(status(429, "rate limited")).with_header("Retry-After", "1"))
        } else {
            Ok("done")
        }
    })
    .retry(policy)
    .when(classify::should_retry)
    .notify(report)
    .call();
    println!("   Result: {:?}\n", result);

    println!("3. Authentication failure is never retried:");
    attempts.set(0);
    let result: Result<&str, _> = (|| {
        attempts.set(attempts.get() + 1);
        Err(Failure::new(status(401, "invalid api key")))
    })
    .retry(policy)
    .when(classify::should_retry)
    .call();
    println!("   Attempts: {}, result: {:?}\n", attempts.get(), result.map_err(|f| f.to_string()));

    println!("4. Retries exhausted, full history:");
    let refused = || Err(Failure::new(ProviderError::Connection("refused".into())));
    let result: Result<&str, _> = refused
        .retry(RetryPolicy::new(2, Duration::from_millis(10), Duration::from_millis(20))?)
        .call();
    if let Err(failure) = result {
        for (depth, attempt) in failure.chain().enumerate() {
            println!("   [{depth}] {attempt}");
        }
    }
    println!();

    println!("5. Fallback across providers:");
    let answer = FallbackChain::new(|| Err(Failure::new(status(500, "primary down"))))
        .or_try(|| Err(Failure::new(ProviderError::Timeout)))
        .or_try(|| Ok("answer from the backup provider"))
        .try_all()?;
    println!("   Result: {answer}");

    Ok(())
}
