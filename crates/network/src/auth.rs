// crates/network/src/auth.rs
//! Bearer credential supply

use crate::error::ApiResult;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Supplies a valid bearer token on demand.
///
/// Implementations refresh transparently. The executor asks once per logical
/// call, before the first attempt.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> ApiResult<String>;
}

#[async_trait]
impl<T: TokenSource + ?Sized> TokenSource for Arc<T> {
    async fn token(&self) -> ApiResult<String> {
        (**self).token().await
    }
}

/// A fixed token that never expires
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StaticToken").field(&"<redacted>").finish()
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> ApiResult<String> {
        Ok(self.0.clone())
    }
}
