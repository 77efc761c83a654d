//! Proxy pre-flight checks against the identity host

use crate::proxy::models::{Proxy, ProxyCheckResult};
use crate::Result;
use futures::stream::{self, StreamExt};
use reqwest::{Client, Proxy as ReqwestProxy};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default timeout for proxy checks in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default number of concurrent checks
const DEFAULT_CONCURRENCY: usize = 10;

/// Default URL to test proxies against
const DEFAULT_TEST_URL: &str = "https://login.microsoftonline.com/";

/// Configuration for proxy checker
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Timeout for each proxy check
    pub timeout: Duration,
    /// Number of concurrent checks
    pub concurrency: usize,
    /// URL to test proxies against
    pub test_url: String,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
            test_url: DEFAULT_TEST_URL.to_string(),
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_test_url(mut self, url: String) -> Self {
        self.test_url = url;
        self
    }
}

/// Checks whether proxies can reach the identity host at all.
///
/// Any HTTP response counts as working: the status code belongs to the remote
/// service, not to the proxy.
#[derive(Debug, Clone, Default)]
pub struct ProxyChecker {
    config: CheckerConfig,
}

impl ProxyChecker {
    /// Create a new proxy checker with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new proxy checker with custom configuration
    pub fn with_config(config: CheckerConfig) -> Self {
        Self { config }
    }

    /// Check a single proxy
    pub async fn check_proxy(&self, proxy: &Proxy) -> ProxyCheckResult {
        let start = Instant::now();

        let client = match self.create_client(proxy) {
            Ok(client) => client,
            Err(e) => return ProxyCheckResult::failed(proxy.clone(), e.to_string()),
        };

        let result = match tokio::time::timeout(
            self.config.timeout,
            client.get(&self.config.test_url).send(),
        )
        .await
        {
            Ok(Ok(_response)) => {
                ProxyCheckResult::working(proxy.clone(), start.elapsed().as_millis() as u64)
            }
            Ok(Err(e)) if e.is_timeout() => ProxyCheckResult::timeout(proxy.clone()),
            Ok(Err(e)) => ProxyCheckResult::failed(proxy.clone(), e.to_string()),
            Err(_) => ProxyCheckResult::timeout(proxy.clone()),
        };

        debug!(proxy = %proxy, working = result.is_working(), "proxy checked");
        result
    }

    /// Check multiple proxies concurrently. Results keep the input order.
    pub async fn check_proxies(&self, proxies: Vec<Proxy>) -> Vec<ProxyCheckResult> {
        stream::iter(proxies)
            .map(|proxy| async move { self.check_proxy(&proxy).await })
            .buffered(self.config.concurrency)
            .collect::<Vec<_>>()
            .await
    }

    /// Check proxies and separate into good and bad results
    pub async fn check_and_separate(
        &self,
        proxies: Vec<Proxy>,
    ) -> (Vec<ProxyCheckResult>, Vec<ProxyCheckResult>) {
        let results = self.check_proxies(proxies).await;

        results.into_iter().partition(|r| r.is_working())
    }

    /// Create a reqwest client with the proxy
    fn create_client(&self, proxy: &Proxy) -> Result<Client> {
        let client = Client::builder()
            .proxy(ReqwestProxy::all(proxy.url())?)
            .timeout(self.config.timeout)
            .build()?;

        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::{ProxyCheckStatus, ProxyType};

    #[test]
    fn test_checker_config_default() {
        let config = CheckerConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.test_url, DEFAULT_TEST_URL);
    }

    #[test]
    fn test_checker_config_builder() {
        let config = CheckerConfig::new()
            .with_timeout(Duration::from_secs(30))
            .with_concurrency(20)
            .with_test_url("http://example.com".to_string());

        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.concurrency, 20);
        assert_eq!(config.test_url, "http://example.com");
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let config = CheckerConfig::new().with_concurrency(0);
        assert_eq!(config.concurrency, 1);
    }

    #[tokio::test]
    async fn test_dead_proxies_are_separated() {
        let config = CheckerConfig::new()
            .with_timeout(Duration::from_secs(2))
            .with_test_url("http://127.0.0.1:9/".to_string());
        let checker = ProxyChecker::with_config(config);
        let proxies = vec![
            Proxy::new("127.0.0.1".to_string(), 9, ProxyType::Http),
            Proxy::new("127.0.0.1".to_string(), 9, ProxyType::Socks5),
        ];

        let (good, bad) = checker.check_and_separate(proxies).await;

        assert!(good.is_empty());
        assert_eq!(bad.len(), 2);
        assert!(bad
            .iter()
            .all(|r| !matches!(r.status, ProxyCheckStatus::Working)));
    }
}
