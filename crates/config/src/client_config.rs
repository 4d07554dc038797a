//! HTTP client configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Where and how the client connects
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every request path is joined onto
    pub base_url: String,

    /// Per-attempt transport timeout in seconds
    pub timeout_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,

    /// Maximum redirects to follow
    pub max_redirects: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 30,
            user_agent: format!("Threadline/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 10,
        }
    }
}

impl ConfigSection for ClientConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::http_url(&self.base_url, "client.base_url"),
            Validator::in_range(self.timeout_secs, 1, 600, "client.timeout_secs"),
            Validator::not_empty(&self.user_agent, "client.user_agent"),
            Validator::in_range(self.max_redirects, 0, 50, "client.max_redirects"),
        ])
    }

    fn merge(&mut self, other: Self) {
        self.base_url = other.base_url;
        self.timeout_secs = other.timeout_secs;
        self.user_agent = other.user_agent;
        self.max_redirects = other.max_redirects;
    }

    fn section_name(&self) -> &'static str {
        "client"
    }
}
