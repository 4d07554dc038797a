// crates/network/src/executor.rs
//! Resilient execution of one logical API call
//!
//! Order per call: rate limiter wait, then circuit breaker admission, then
//! the attempt loop. The breaker wraps the whole loop, so a call that
//! succeeds on its third attempt counts as one success.

use crate::auth::TokenSource;
use crate::error::{ApiError, ApiResult};
use crate::headers::{self, RateLimitHeaders};
use crate::transport::{ApiRequest, ApiResponse, Transport};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use std::fmt;
use std::sync::Arc;
use threadline_resilience::{
    with_retry, CircuitBreaker, Classify, Context, RateLimiter, RetryPolicy,
};

/// Composes rate limiting, circuit breaking and retry around a [`Transport`].
///
/// Every subsystem is optional. With none configured a call is a single,
/// unthrottled attempt.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    token_source: Option<Arc<dyn TokenSource>>,
    rate_limiter: Option<RateLimiter>,
    circuit_breaker: Option<CircuitBreaker>,
    retry_policy: Option<RetryPolicy>,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            token_source: None,
            rate_limiter: None,
            circuit_breaker: None,
            retry_policy: None,
        }
    }

    pub fn with_token_source(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.token_source = Some(source);
        self
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn with_circuit_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.circuit_breaker = Some(breaker);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub fn rate_limiter(&self) -> Option<&RateLimiter> {
        self.rate_limiter.as_ref()
    }

    pub fn circuit_breaker(&self) -> Option<&CircuitBreaker> {
        self.circuit_breaker.as_ref()
    }

    pub fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.retry_policy.as_ref()
    }

    /// Executes `request`, returning the first 2xx response or exactly one
    /// terminal error.
    pub async fn execute(&self, ctx: &Context, request: ApiRequest) -> ApiResult<ApiResponse> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.wait(ctx).await?;
        }

        match &self.circuit_breaker {
            Some(breaker) => {
                breaker
                    .execute(|| self.authorized_call(ctx, request))
                    .await
            }
            None => self.authorized_call(ctx, request).await,
        }
    }

    async fn authorized_call(&self, ctx: &Context, mut request: ApiRequest) -> ApiResult<ApiResponse> {
        if let Some(source) = &self.token_source {
            let token = ctx.run(source.token()).await??;
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::Credential("token is not a valid header value".into()))?;
            value.set_sensitive(true);
            request.headers.insert(AUTHORIZATION, value);
        }

        let Some(policy) = &self.retry_policy else {
            return self.attempt(ctx, &request, 0).await;
        };

        let mut attempts = 0;
        let result = with_retry(ctx, policy, |attempt| {
            attempts = attempt + 1;
            self.attempt(ctx, &request, attempt)
        })
        .await;

        result.map_err(|err| {
            if attempts > 1 && policy.is_retryable(&err.failure_class()) {
                ApiError::RetriesExhausted {
                    attempts,
                    last: Box::new(err),
                }
            } else {
                err
            }
        })
    }

    async fn attempt(&self, ctx: &Context, request: &ApiRequest, attempt: u32) -> ApiResult<ApiResponse> {
        log::debug!(
            "{} {} (attempt {})",
            request.method,
            request.url.path(),
            attempt + 1
        );
        let response = ctx.run(self.transport.send(request.clone())).await??;

        if let Some(limiter) = &self.rate_limiter {
            if let Some(quota) = RateLimitHeaders::parse(&response.headers) {
                limiter.update_from_headers(quota.remaining, quota.reset_at);
            }
        }

        if response.is_success() {
            return Ok(response);
        }

        let hint = headers::retry_after(&response.headers);
        log::debug!("{} {} returned {}", request.method, request.url.path(), response.status);
        Err(ApiError::from_status(response.status, hint, &response.body))
    }
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("authorized", &self.token_source.is_some())
            .field("rate_limiter", &self.rate_limiter)
            .field("circuit_breaker", &self.circuit_breaker)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}
