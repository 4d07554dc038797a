// crates/network/src/lib.rs
//! Resilient client for a paginated, rate-limited REST API
//!
//! Every call goes through a [`RequestExecutor`]: rate limiter wait, circuit
//! breaker admission, then attempts with backoff. [`Client`] wraps that with
//! URL handling, JSON decoding and pagination.

mod auth;
mod client;
mod error;
mod executor;
mod headers;
mod pagination;
mod transport;

pub use auth::{StaticToken, TokenSource};
pub use client::{Client, ClientBuilder, ClientConfig, RateLimitConfig};
pub use error::{ApiError, ApiResult, ErrorKind, TransportError};
pub use executor::RequestExecutor;
pub use headers::{retry_after, RateLimitHeaders, RATELIMIT_REMAINING, RATELIMIT_RESET};
pub use pagination::{paginate, paginate_after, Page, PaginateOptions};
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport, TransportConfig};

pub use threadline_resilience::Context;
