use thiserror::Error;

/// Failure to get a response body back over the chosen route
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build HTTP client for {route}: {reason}")]
    Client { route: String, reason: String },
    #[error("connection through {route} failed: {reason}")]
    Connect { route: String, reason: String },
    #[error("request through {route} timed out")]
    Timeout { route: String },
    #[error("request through {route} failed: {reason}")]
    Request { route: String, reason: String },
}

/// A response body that does not carry an existence verdict
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponseError {
    #[error("response has no IfExistsResult field")]
    MissingResult,
    #[error("response is not JSON: {snippet}")]
    Unparseable { snippet: String },
}

/// Why a single attempt did not yield a verdict
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("malformed response: {0}")]
    Malformed(#[from] ResponseError),
}
