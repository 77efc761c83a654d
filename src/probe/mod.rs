//! Account existence probing
//!
//! This module provides functionality for:
//! - Building `GetCredentialType` requests and reading their verdicts
//! - Sending probes directly or through a proxy
//! - Driving each address through rotation and retries to a final outcome

pub mod error;
pub mod models;
pub mod response;
pub mod transport;
pub mod validator;

pub use error::{AttemptError, ResponseError, TransportError};
pub use models::{CredentialTypeRequest, CredentialTypeResponse, ProbeRecord, ValidationOutcome};
pub use response::{parse_verdict, Verdict};
pub use transport::{HttpTransport, Transport};
pub use validator::{ProbeConfig, Validator, DEFAULT_ENDPOINT};
