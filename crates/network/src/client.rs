// crates/network/src/client.rs
//! API client with resilience

use crate::auth::TokenSource;
use crate::error::{ApiError, ApiResult};
use crate::executor::RequestExecutor;
use crate::pagination::{paginate, Page, PaginateOptions};
use crate::transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport, TransportConfig};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use threadline_resilience::{
    CircuitBreaker, CircuitBreakerConfig, Context, RateLimiter, RetryPolicy,
};

/// Local throttling settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    pub requests_per_minute: f64,
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60.0,
            burst: 5,
        }
    }
}

/// API client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL request paths are joined onto
    pub base_url: String,
    /// Per-attempt request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Maximum redirects to follow
    pub max_redirects: usize,
    /// Rate limiter, shared by every call of the client
    pub rate_limit: Option<RateLimitConfig>,
    /// Retry policy
    pub retry_policy: Option<RetryPolicy>,
    /// Circuit breaker config
    pub circuit_breaker_config: Option<CircuitBreakerConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let transport = TransportConfig::default();
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: transport.timeout,
            user_agent: transport.user_agent,
            max_redirects: transport.max_redirects,
            rate_limit: Some(RateLimitConfig::default()),
            retry_policy: Some(RetryPolicy::new(3)),
            circuit_breaker_config: Some(CircuitBreakerConfig::new(5, Duration::from_secs(60))),
        }
    }
}

impl From<&threadline_config::Config> for ClientConfig {
    fn from(config: &threadline_config::Config) -> Self {
        let rate_limit = config.rate_limit.enabled.then(|| RateLimitConfig {
            requests_per_minute: config.rate_limit.requests_per_minute,
            burst: config.rate_limit.burst,
        });

        let retry = &config.retry;
        let retry_policy = retry.enabled.then(|| {
            RetryPolicy::new(retry.max_retries)
                .with_base_delay(Duration::from_millis(retry.base_delay_ms))
                .with_max_delay(Duration::from_millis(retry.max_delay_ms))
                .with_jitter(retry.jitter_factor)
                .with_retryable_status_codes(retry.retryable_status_codes.iter().copied())
                .with_respect_retry_after(retry.respect_retry_after)
        });

        let breaker = &config.circuit_breaker;
        let circuit_breaker_config = breaker.enabled.then(|| {
            CircuitBreakerConfig::new(
                breaker.failure_threshold,
                Duration::from_millis(breaker.open_timeout_ms),
            )
            .with_success_threshold(breaker.success_threshold)
            .with_max_half_open_requests(breaker.max_half_open_requests)
        });

        Self {
            base_url: config.client.base_url.clone(),
            timeout: Duration::from_secs(config.client.timeout_secs),
            user_agent: config.client.user_agent.clone(),
            max_redirects: config.client.max_redirects,
            rate_limit,
            retry_policy,
            circuit_breaker_config,
        }
    }
}

/// Builds a [`Client`]; each setter overrides earlier ones, unset fields keep their defaults
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    token_source: Option<Arc<dyn TokenSource>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.config.max_redirects = max_redirects;
        self
    }

    pub fn rate_limit(mut self, requests_per_minute: f64, burst: u32) -> Self {
        self.config.rate_limit = Some(RateLimitConfig {
            requests_per_minute,
            burst,
        });
        self
    }

    pub fn without_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.config.retry_policy = Some(policy);
        self
    }

    pub fn without_retry(mut self) -> Self {
        self.config.retry_policy = None;
        self
    }

    pub fn circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.config.circuit_breaker_config = Some(config);
        self
    }

    pub fn without_circuit_breaker(mut self) -> Self {
        self.config.circuit_breaker_config = None;
        self
    }

    pub fn token_source(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.token_source = Some(source);
        self
    }

    /// Replaces the default reqwest transport
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> ApiResult<Client> {
        let config = self.config;
        let base_url = parse_base_url(&config.base_url)?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&TransportConfig {
                timeout: config.timeout,
                user_agent: config.user_agent.clone(),
                max_redirects: config.max_redirects,
            })?),
        };

        let mut executor = RequestExecutor::new(transport);
        if let Some(source) = self.token_source {
            executor = executor.with_token_source(source);
        }
        if let Some(limit) = config.rate_limit {
            executor =
                executor.with_rate_limiter(RateLimiter::new(limit.requests_per_minute, limit.burst));
        }
        if let Some(breaker) = &config.circuit_breaker_config {
            executor = executor.with_circuit_breaker(CircuitBreaker::new(breaker.clone()));
        }
        if let Some(policy) = &config.retry_policy {
            executor = executor.with_retry_policy(policy.clone());
        }

        Ok(Client {
            executor,
            base_url,
            config,
        })
    }
}

/// API client with resilience features
#[derive(Debug, Clone)]
pub struct Client {
    executor: RequestExecutor,
    base_url: Url,
    config: ClientConfig,
}

impl Client {
    /// Creates a new client with default configuration
    pub fn new() -> ApiResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> ApiResult<Self> {
        ClientBuilder::from_config(config).build()
    }

    /// Creates a client from a loaded configuration file
    pub fn from_config(config: &threadline_config::Config) -> ApiResult<Self> {
        Self::with_config(ClientConfig::from(config))
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub fn rate_limiter(&self) -> Option<&RateLimiter> {
        self.executor.rate_limiter()
    }

    pub fn circuit_breaker(&self) -> Option<&CircuitBreaker> {
        self.executor.circuit_breaker()
    }

    /// Resolves `path` against the base URL
    pub fn url(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidRequest(format!("bad path {:?}: {}", path, e)))
    }

    /// Sends a prepared request through the resilience stack
    pub async fn send(&self, ctx: &Context, request: ApiRequest) -> ApiResult<ApiResponse> {
        self.executor.execute(ctx, request).await
    }

    /// Performs a GET request
    pub async fn get(
        &self,
        ctx: &Context,
        path: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<ApiResponse> {
        let request = self.get_request(path, query, None)?;
        self.send(ctx, request).await
    }

    /// Performs a GET request and decodes the JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        path: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<T> {
        self.get(ctx, path, query).await?.json()
    }

    /// Walks a listing, passing the cursor as the `after` query parameter.
    ///
    /// `extract` turns each response into a page.
    pub async fn paginate<T, F>(
        &self,
        ctx: &Context,
        path: &str,
        query: &[(&str, &str)],
        options: PaginateOptions,
        extract: F,
    ) -> ApiResult<Vec<T>>
    where
        F: Fn(ApiResponse) -> ApiResult<Page<T>>,
    {
        let extract = &extract;
        paginate(ctx, options, move |ctx, after| {
            let request = self.get_request(path, query, Some(after));
            async move {
                let response = self.send(&ctx, request?).await?;
                extract(response)
            }
        })
        .await
    }

    /// [`Client::paginate`] for endpoints whose body is a [`Page`] in JSON
    pub async fn paginate_json<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        path: &str,
        query: &[(&str, &str)],
        options: PaginateOptions,
    ) -> ApiResult<Vec<T>> {
        self.paginate(ctx, path, query, options, |response| response.json())
            .await
    }

    fn get_request(
        &self,
        path: &str,
        query: &[(&str, &str)],
        after: Option<String>,
    ) -> ApiResult<ApiRequest> {
        let mut request = ApiRequest::get(self.url(path)?);
        for (key, value) in query {
            request = request.with_query(*key, *value);
        }
        if let Some(after) = after.filter(|after| !after.is_empty()) {
            request = request.with_query("after", after);
        }
        Ok(request)
    }
}

fn parse_base_url(raw: &str) -> ApiResult<Url> {
    // Without a trailing slash `join` would replace the last path segment
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized)
        .map_err(|e| ApiError::InvalidRequest(format!("bad base url {:?}: {}", raw, e)))
}
