//! HTTP exchange with the credential-type endpoint

use crate::probe::error::TransportError;
use crate::probe::models::CredentialTypeRequest;
use crate::proxy::models::Route;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Proxy as ReqwestProxy};
use std::time::Duration;

/// Sends one credential-type request over a given route and returns the raw
/// response body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(
        &self,
        route: &Route,
        request: &CredentialTypeRequest,
    ) -> Result<String, TransportError>;
}

/// reqwest-backed transport. Each attempt gets its own client so that a
/// connection never outlives the attempt that opened it.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: String,
    timeout: Duration,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(endpoint: String, timeout: Duration, user_agent: String) -> Self {
        Self {
            endpoint,
            timeout,
            user_agent,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn create_client(&self, route: &Route) -> Result<Client, TransportError> {
        let client_error = |e: reqwest::Error| TransportError::Client {
            route: route.to_string(),
            reason: e.to_string(),
        };

        let mut builder = Client::builder()
            .timeout(self.timeout)
            .pool_max_idle_per_host(0);

        builder = match route {
            Route::Proxy(proxy) => {
                builder.proxy(ReqwestProxy::all(proxy.url()).map_err(client_error)?)
            }
            // Keep system proxy settings out of the direct path
            Route::Direct => builder.no_proxy(),
        };

        builder.build().map_err(client_error)
    }

    fn classify(&self, route: &Route, error: reqwest::Error) -> TransportError {
        let route = route.to_string();
        if error.is_timeout() {
            TransportError::Timeout { route }
        } else if error.is_connect() {
            TransportError::Connect {
                route,
                reason: error.to_string(),
            }
        } else {
            TransportError::Request {
                route,
                reason: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(
        &self,
        route: &Route,
        request: &CredentialTypeRequest,
    ) -> Result<String, TransportError> {
        let client = self.create_client(route)?;
        let body = serde_json::to_string(request).map_err(|e| TransportError::Request {
            route: route.to_string(),
            reason: e.to_string(),
        })?;

        let exchange = async {
            let response = client
                .post(&self.endpoint)
                .header(CONTENT_TYPE, "application/json")
                .header(USER_AGENT, self.user_agent.as_str())
                .body(body)
                .send()
                .await?;
            response.text().await
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(self.classify(route, e)),
            Err(_) => Err(TransportError::Timeout {
                route: route.to_string(),
            }),
        }
    }
}
