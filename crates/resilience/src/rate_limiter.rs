// crates/resilience/src/rate_limiter.rs
//! Adaptive token bucket rate limiting
//!
//! The bucket refills continuously at `limit` tokens per second up to
//! `burst` tokens. Server quota headers can reshape both values at runtime
//! through [`RateLimiter::update_from_headers`].

use crate::context::Context;
use crate::error::ContextError;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Rate used once the server reports an exhausted quota: one request per 10s
pub const FLOOR_RATE: f64 = 0.1;

/// Upper bound for the burst derived from server headers
pub const MAX_ADAPTED_BURST: u32 = 5;

#[derive(Debug)]
struct Bucket {
    /// Tokens per second
    limit: f64,
    burst: u32,
    /// Negative while reservations are outstanding
    tokens: f64,
    last: Instant,
}

impl Bucket {
    fn tokens_at(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        (self.tokens + elapsed * self.limit).min(f64::from(self.burst))
    }

    fn advance(&mut self, now: Instant) {
        self.tokens = self.tokens_at(now);
        self.last = now;
    }

    fn take(&mut self, now: Instant) -> Duration {
        self.advance(now);
        self.tokens -= 1.0;
        if self.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-self.tokens / self.limit)
        }
    }

    fn give_back(&mut self, now: Instant) {
        self.advance(now);
        self.tokens = (self.tokens + 1.0).min(f64::from(self.burst));
    }

    fn reshape(&mut self, limit: f64, burst: u32, now: Instant) {
        self.advance(now);
        self.limit = limit;
        self.burst = burst;
        self.tokens = self.tokens.min(f64::from(burst));
    }
}

/// Token bucket rate limiter shared by every call of one client
#[derive(Debug, Clone)]
pub struct RateLimiter {
    bucket: Arc<Mutex<Bucket>>,
}

impl RateLimiter {
    /// Creates a limiter allowing `requests_per_minute` with bursts of `burst`.
    ///
    /// The bucket starts full. `burst` is raised to 1 if zero, and a
    /// non-positive rate falls back to [`FLOOR_RATE`].
    pub fn new(requests_per_minute: f64, burst: u32) -> Self {
        let per_second = requests_per_minute / 60.0;
        let limit = if per_second.is_finite() && per_second > 0.0 {
            per_second
        } else {
            FLOOR_RATE
        };
        let burst = burst.max(1);

        Self {
            bucket: Arc::new(Mutex::new(Bucket {
                limit,
                burst,
                tokens: f64::from(burst),
                last: Instant::now(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Bucket> {
        self.bucket.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current refill rate in requests per second
    pub fn limit(&self) -> f64 {
        self.lock().limit
    }

    /// Current bucket capacity
    pub fn burst(&self) -> u32 {
        self.lock().burst
    }

    /// Tokens available right now (negative while reservations are pending)
    pub fn available(&self) -> f64 {
        self.lock().tokens_at(Instant::now())
    }

    /// Consumes a token only if one is immediately available
    pub fn allow(&self) -> bool {
        let now = Instant::now();
        let mut bucket = self.lock();
        bucket.advance(now);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Commits a token now and reports how long the caller must wait for it
    pub fn reserve(&self) -> Reservation {
        let now = Instant::now();
        let delay = self.lock().take(now);
        Reservation {
            bucket: Arc::clone(&self.bucket),
            ready_at: now + delay,
            delay,
        }
    }

    /// Waits until a token is available or `ctx` finishes.
    ///
    /// A token is only consumed on success. When the wait would overshoot the
    /// context deadline the call fails immediately with
    /// [`ContextError::DeadlineExceeded`].
    pub async fn wait(&self, ctx: &Context) -> Result<(), ContextError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }

        let reservation = self.reserve();
        let delay = reservation.delay();
        if delay.is_zero() {
            return Ok(());
        }

        if let Some(remaining) = ctx.remaining() {
            if delay > remaining {
                reservation.cancel();
                return Err(ContextError::DeadlineExceeded);
            }
        }

        log::trace!("rate limiter waiting {:?} for a token", delay);
        match ctx.sleep(delay).await {
            Ok(()) => Ok(()),
            Err(err) => {
                reservation.cancel();
                Err(err)
            }
        }
    }

    /// Adapts the bucket to the quota the server reported.
    ///
    /// - `remaining <= 0` collapses to [`FLOOR_RATE`] with a burst of 1 so the
    ///   client keeps trickling and eventually recovers.
    /// - A missing reset time, or one that is not in the future, is ignored.
    /// - Otherwise the rate spreads `remaining` over the time left and the
    ///   burst becomes `remaining / 10` clamped to `1..=5`.
    pub fn update_from_headers(&self, remaining: i64, reset_at: Option<DateTime<Utc>>) {
        let until_reset = reset_at.and_then(|at| (at - Utc::now()).to_std().ok());
        self.apply_quota(remaining, until_reset);
    }

    fn apply_quota(&self, remaining: i64, until_reset: Option<Duration>) {
        let now = Instant::now();

        if remaining <= 0 {
            log::debug!("quota exhausted, throttling to {} req/s", FLOOR_RATE);
            self.lock().reshape(FLOOR_RATE, 1, now);
            return;
        }

        let Some(until_reset) = until_reset.filter(|d| !d.is_zero()) else {
            log::trace!("ignoring stale rate limit reset time");
            return;
        };

        let limit = remaining as f64 / until_reset.as_secs_f64();
        let burst = (remaining / 10).clamp(1, i64::from(MAX_ADAPTED_BURST)) as u32;
        log::debug!(
            "adapting rate limiter: {} remaining over {:?} -> {:.3} req/s, burst {}",
            remaining,
            until_reset,
            limit,
            burst
        );
        self.lock().reshape(limit, burst, now);
    }
}

/// A token committed ahead of use
#[derive(Debug)]
pub struct Reservation {
    bucket: Arc<Mutex<Bucket>>,
    ready_at: Instant,
    delay: Duration,
}

impl Reservation {
    /// How long the caller must wait before acting
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns the token if the reservation has not matured yet
    pub fn cancel(self) {
        let now = Instant::now();
        if now > self.ready_at {
            return;
        }
        self.bucket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .give_back(now);
    }
}
