//! Tenant Probe - Microsoft 365 account existence checker
//!
//! Classifies email addresses as registered or not on a Microsoft 365 tenant
//! through the unauthenticated `GetCredentialType` endpoint. Requests rotate
//! through a proxy pool, fall back to a direct connection once every proxy
//! has failed, and every address ends with an outcome.

pub mod output;
pub mod probe;
pub mod proxy;
pub mod runner;

pub use probe::{ProbeConfig, ProbeRecord, ValidationOutcome, Validator, DEFAULT_ENDPOINT};
pub use proxy::{Proxy, ProxyParser, ProxyPool, ProxyType, Route};
pub use runner::{BatchRunner, BatchSummary};

use std::time::Duration;

/// Application result type
pub type Result<T> = anyhow::Result<T>;

/// Default pause between two addresses in milliseconds
const DEFAULT_DELAY_MS: u64 = 500;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Pause between two addresses
    pub delay: Duration,
    /// Per-address probe settings
    pub probe: ProbeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            probe: ProbeConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_probe(mut self, probe: ProbeConfig) -> Self {
        self.probe = probe;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.delay, Duration::from_millis(500));
        assert_eq!(config.probe.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_config_builder() {
        let config = Config::new()
            .with_delay(Duration::ZERO)
            .with_probe(ProbeConfig::new().with_max_direct_retries(9));
        assert!(config.delay.is_zero());
        assert_eq!(config.probe.max_direct_retries, 9);
    }
}
