//! Connection settings for [`RpcClient`](crate::RpcClient).

use std::time::Duration;

use url::Url;

/// Endpoint served by a daemon's web interface on its default port.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8112/json";

/// Per-request timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings used to build the HTTP transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcClientConfig {
    /// JSON-RPC endpoint every call is posted to.
    pub endpoint: Url,
    /// Upper bound for a single request, including reading the body.
    pub timeout: Duration,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl RpcClientConfig {
    /// Settings for `endpoint` with the default timeout and user agent.
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("sluice/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Replace the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local() -> RpcClientConfig {
        RpcClientConfig::new(Url::parse(DEFAULT_ENDPOINT).expect("default endpoint"))
    }

    #[test]
    fn defaults_target_the_local_web_port() {
        let config = local();
        assert_eq!(config.endpoint.as_str(), DEFAULT_ENDPOINT);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.user_agent.starts_with("sluice/"));
    }

    #[test]
    fn builders_override_fields() {
        let config = local()
            .with_timeout(Duration::from_secs(2))
            .with_user_agent("tests");
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.user_agent, "tests");
    }
}
