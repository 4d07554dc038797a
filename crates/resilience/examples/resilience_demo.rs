// crates/resilience/examples/resilience_demo.rs
//! Demonstration of resilience patterns

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use threadline_resilience::{
    with_retry, CircuitBreaker, CircuitBreakerConfig, Context, FailureClass, RateLimiter,
    ResilienceError, RetryPolicy,
};

#[tokio::main]
async fn main() {
    println!("Resilience Patterns Demo");
    println!("========================\n");

    demo_retry().await;
    println!();
    demo_circuit_breaker().await;
    println!();
    demo_rate_limiter().await;
    println!();
    demo_context().await;
}

async fn demo_retry() {
    println!("1. Retry Pattern");
    println!("----------------");

    let policy = RetryPolicy::new(3).with_base_delay(Duration::from_millis(100));
    let ctx = Context::new();
    let calls = AtomicU32::new(0);

    let result = with_retry(&ctx, &policy, |attempt| {
        calls.fetch_add(1, Ordering::SeqCst);
        async move {
            println!("  Attempt {}", attempt + 1);
            if attempt < 2 {
                Err(ResilienceError::operation(
                    FailureClass::Status(503),
                    "service unavailable",
                ))
            } else {
                Ok(42)
            }
        }
    })
    .await;

    match result {
        Ok(value) => println!("✓ Success after {} calls: {}", calls.load(Ordering::SeqCst), value),
        Err(e) => println!("✗ Failed: {}", e),
    }
}

async fn demo_circuit_breaker() {
    println!("2. Circuit Breaker Pattern");
    println!("--------------------------");

    let config = CircuitBreakerConfig::new(3, Duration::from_millis(100))
        .with_success_threshold(1)
        .on_state_change(|from, to| println!("  [transition] {} -> {}", from, to));
    let cb = CircuitBreaker::new(config);

    for i in 1..=5 {
        let result = cb
            .execute(|| async move {
                if i <= 3 {
                    Err(ResilienceError::operation(
                        FailureClass::Transport,
                        "connection refused",
                    ))
                } else {
                    Ok(42)
                }
            })
            .await;

        match result {
            Ok(_) => println!("  Request {}: ✓ Success", i),
            Err(e) => println!("  Request {}: ✗ {}", i, e),
        }
    }

    println!("  Circuit state: {}", cb.state());

    tokio::time::sleep(Duration::from_millis(150)).await;
    println!("  Waited for timeout...");

    let result = cb
        .execute(|| async { Ok::<_, ResilienceError>(42) })
        .await;
    match result {
        Ok(_) => println!("  After timeout: ✓ Probe succeeded"),
        Err(e) => println!("  After timeout: ✗ {}", e),
    }

    println!("  Circuit state: {}", cb.state());
}

async fn demo_rate_limiter() {
    println!("3. Rate Limiter Pattern");
    println!("-----------------------");

    let limiter = RateLimiter::new(300.0, 5);
    println!(
        "  Limit: {} requests per second, burst {}",
        limiter.limit(),
        limiter.burst()
    );

    for i in 1..=7 {
        if limiter.allow() {
            println!("  Request {}: ✓ Allowed", i);
        } else {
            println!("  Request {}: ✗ Throttled", i);
        }
    }

    let ctx = Context::new();
    match limiter.wait(&ctx).await {
        Ok(()) => println!("  Waited for a fresh token"),
        Err(e) => println!("  Wait failed: {}", e),
    }
}

async fn demo_context() {
    println!("4. Deadlines");
    println!("------------");

    let ctx = Context::new().with_timeout(Duration::from_millis(50));

    match ctx.sleep(Duration::from_millis(10)).await {
        Ok(()) => println!("  Short sleep: ✓ Completed"),
        Err(e) => println!("  Short sleep: ✗ {}", e),
    }

    match ctx.sleep(Duration::from_millis(100)).await {
        Ok(()) => println!("  Long sleep: ✓ Completed"),
        Err(e) => println!("  Long sleep: ✗ {}", e),
    }
}
