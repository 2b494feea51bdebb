//! Streaming retry example
//!
//! A streamed completion whose connection drops before the first token is
//! retried; a drop after tokens have been delivered reaches the consumer.
//!
//! Run with: cargo run --example streaming_retry

use std::cell::Cell;
use std::time::Duration;

use second_wind::{Failure, ProviderError, RetryPolicy, Retryable, classify};

type Token = Result<&'static str, Failure<ProviderError>>;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let policy = RetryPolicy::new(3, Duration::from_millis(20), Duration::from_millis(100))?;
    let connects = Cell::new(0);

    let tokens = (|| {
        connects.set(connects.get() + 1);
        let stream: Vec<Token> = match connects.get() {
            1 => vec![Err(Failure::new(ProviderError::Connection("reset".into())))],
            2 => vec![
                Ok("The "),
                Ok("answer "),
                Ok("is "),
                Err(Failure::new(ProviderError::Timeout)),
            ],
            _ => vec![Ok("unreachable")],
        };
        Ok::<_, Failure<ProviderError>>(stream)
    })
    .retry(policy)
    .when(classify::should_retry)
    .call_streaming()?;

    println!("connected after {} attempts", connects.get());
    for token in tokens {
        match token {
            Ok(text) => print!("{text}"),
            Err(failure) => {
                println!();
                println!("stream failed mid-way: {failure}");
                break;
            }
        }
    }

    Ok(())
}
