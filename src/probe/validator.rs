//! Per-address probe loop
//!
//! One address is driven through an explicit state machine until it reaches
//! a terminal classification:
//!
//! - `TryProxy`: send through the current pool proxy. Anything short of a
//!   trustworthy verdict retires that proxy and re-reads the pool.
//! - `TryDirect`: send without a proxy. Failures and throttling back off and
//!   retry until the direct retry budget is spent.
//! - `Done`: a verdict (or `Undetermined`) and the route that produced it.
//!
//! The proxy path is bounded by the pool size because every non-terminal
//! proxy attempt retires one proxy, and the direct path is bounded by
//! `max_direct_retries`, so the loop always terminates.

use crate::probe::error::AttemptError;
use crate::probe::models::{CredentialTypeRequest, ProbeRecord, ValidationOutcome};
use crate::probe::response::{parse_verdict, snippet, Verdict};
use crate::probe::transport::{HttpTransport, Transport};
use crate::proxy::models::{Proxy, Route};
use crate::proxy::pool::ProxyPool;
use std::fmt::Display;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Microsoft 365 credential-type endpoint
pub const DEFAULT_ENDPOINT: &str = "https://login.microsoftonline.com/common/GetCredentialType";

/// Default per-attempt timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Default number of direct retries before giving up on an address
const DEFAULT_MAX_DIRECT_RETRIES: u32 = 3;

/// Default pause after a failed direct attempt
const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// Default pause after a throttled direct attempt
const DEFAULT_THROTTLE_BACKOFF_SECS: u64 = 3;

/// Default user agent sent with every probe
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Log rotation progress every this many rotations on one address
const ROTATION_REPORT_INTERVAL: u32 = 10;

/// Configuration for the probe loop
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Credential-type endpoint URL
    pub endpoint: String,
    /// Timeout for each attempt
    pub timeout: Duration,
    /// Direct retries allowed after the first direct failure
    pub max_direct_retries: u32,
    /// Pause after a failed or malformed direct attempt
    pub retry_backoff: Duration,
    /// Pause after a throttled direct attempt
    pub throttle_backoff: Duration,
    /// User agent header
    pub user_agent: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_direct_retries: DEFAULT_MAX_DIRECT_RETRIES,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            throttle_backoff: Duration::from_secs(DEFAULT_THROTTLE_BACKOFF_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ProbeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_direct_retries(mut self, retries: u32) -> Self {
        self.max_direct_retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_throttle_backoff(mut self, backoff: Duration) -> Self {
        self.throttle_backoff = backoff;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

enum AttemptState {
    TryProxy(Proxy),
    TryDirect { failures: u32 },
    Done {
        outcome: ValidationOutcome,
        route: Route,
    },
}

impl AttemptState {
    fn from_pool(pool: &ProxyPool) -> Self {
        match pool.current() {
            Route::Proxy(proxy) => AttemptState::TryProxy(proxy),
            Route::Direct => AttemptState::TryDirect { failures: 0 },
        }
    }

    fn conclude(verdict: Verdict, route: Route) -> Option<Self> {
        let outcome = match verdict {
            Verdict::Exists => ValidationOutcome::Valid,
            Verdict::Absent => ValidationOutcome::Invalid,
            Verdict::Throttled => return None,
        };
        Some(AttemptState::Done { outcome, route })
    }
}

/// Classifies addresses against the credential-type endpoint
pub struct Validator<T> {
    transport: T,
    config: ProbeConfig,
}

impl Validator<HttpTransport> {
    /// Validator speaking HTTP to `config.endpoint`
    pub fn with_config(config: ProbeConfig) -> Self {
        let transport = HttpTransport::new(
            config.endpoint.clone(),
            config.timeout,
            config.user_agent.clone(),
        );
        Self::new(transport, config)
    }
}

impl<T: Transport> Validator<T> {
    pub fn new(transport: T, config: ProbeConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Drive one address to a terminal classification.
    ///
    /// Failed and throttled proxies are retired from `pool` as a side effect.
    /// Once the pool is exhausted the address continues on the direct route;
    /// it is never dropped.
    pub async fn validate(&self, address: &str, pool: &mut ProxyPool) -> ProbeRecord {
        let request = CredentialTypeRequest::new(address);
        let mut attempts = 0u32;
        let mut rotations = 0u32;
        let mut state = AttemptState::from_pool(pool);

        loop {
            state = match state {
                AttemptState::TryProxy(proxy) => {
                    attempts += 1;
                    let route = Route::Proxy(proxy.clone());
                    debug!(address, route = %route, attempt = attempts, "sending probe");

                    let result = self.attempt(&route, &request).await;
                    match result {
                        Ok(verdict) => match AttemptState::conclude(verdict, route) {
                            Some(done) => done,
                            None => {
                                debug!(address, proxy = %proxy, "throttled, rotating proxy");
                                self.rotate(address, &proxy, pool, &mut rotations)
                            }
                        },
                        Err(e) => {
                            debug!(
                                address,
                                proxy = %proxy,
                                error = %e,
                                "proxy attempt failed, rotating"
                            );
                            self.rotate(address, &proxy, pool, &mut rotations)
                        }
                    }
                }
                AttemptState::TryDirect { failures } => {
                    attempts += 1;
                    debug!(address, route = "direct", attempt = attempts, "sending probe");

                    let result = self.attempt(&Route::Direct, &request).await;
                    match result {
                        Ok(verdict) => match AttemptState::conclude(verdict, Route::Direct) {
                            Some(done) => done,
                            None => {
                                let backoff = self.config.throttle_backoff;
                                self.retry_direct(address, failures, backoff, &"throttled")
                                    .await
                            }
                        },
                        Err(e) => {
                            self.retry_direct(address, failures, self.config.retry_backoff, &e)
                                .await
                        }
                    }
                }
                AttemptState::Done { outcome, route } => {
                    return ProbeRecord::new(address.to_string(), outcome, route, attempts);
                }
            };
        }
    }

    async fn attempt(
        &self,
        route: &Route,
        request: &CredentialTypeRequest,
    ) -> Result<Verdict, AttemptError> {
        let body = self.transport.post(route, request).await?;
        debug!(route = %route, body = %snippet(&body), "response received");
        Ok(parse_verdict(&body)?)
    }

    fn rotate(
        &self,
        address: &str,
        proxy: &Proxy,
        pool: &mut ProxyPool,
        rotations: &mut u32,
    ) -> AttemptState {
        pool.mark_failed(proxy);
        *rotations += 1;

        if *rotations % ROTATION_REPORT_INTERVAL == 0 {
            info!(
                address,
                rotations = *rotations,
                alive = pool.alive_count(),
                total = pool.len(),
                "rotating proxies"
            );
        }

        AttemptState::from_pool(pool)
    }

    async fn retry_direct(
        &self,
        address: &str,
        failures: u32,
        backoff: Duration,
        reason: &(dyn Display + Sync),
    ) -> AttemptState {
        let failures = failures + 1;
        if failures > self.config.max_direct_retries {
            warn!(address, failures, reason = %reason, "direct retries exhausted");
            return AttemptState::Done {
                outcome: ValidationOutcome::Undetermined,
                route: Route::Direct,
            };
        }

        debug!(
            address,
            failures,
            max_retries = self.config.max_direct_retries,
            reason = %reason,
            backoff = ?backoff,
            "direct attempt failed, retrying"
        );
        if !backoff.is_zero() {
            tokio::time::sleep(backoff).await;
        }

        AttemptState::TryDirect { failures }
    }
}
