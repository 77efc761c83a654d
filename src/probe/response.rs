//! Interpretation of `GetCredentialType` response bodies

use crate::probe::error::ResponseError;
use crate::probe::models::{CredentialTypeResponse, Flag};
use once_cell::sync::Lazy;
use regex::Regex;

static THROTTLE_STATUS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""ThrottleStatus"\s*:\s*("[^"]*"|[^,}\s]+)"#).expect("Invalid ThrottleStatus regex")
});

static IF_EXISTS_RESULT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""IfExistsResult"\s*:\s*("[^"]*"|[^,}\s]+)"#).expect("Invalid IfExistsResult regex")
});

/// Longest body excerpt carried in errors and debug logs
pub const SNIPPET_LEN: usize = 200;

/// What one well-formed response says about an address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Exists,
    Absent,
    /// The service rate-limited the request; its `IfExistsResult` is noise
    Throttled,
}

fn verdict(response: &CredentialTypeResponse) -> Option<Verdict> {
    // A ThrottleStatus that is present but unreadable is not proof of "not throttled"
    match response.throttle_status {
        Flag::Missing | Flag::Value(0) => {}
        Flag::Value(_) | Flag::Unreadable => return Some(Verdict::Throttled),
    }

    match response.if_exists_result {
        Flag::Value(0) => Some(Verdict::Exists),
        Flag::Value(_) => Some(Verdict::Absent),
        Flag::Missing | Flag::Unreadable => None,
    }
}

/// Read a verdict out of a response body.
///
/// Strict JSON is tried first. Bodies that are not valid JSON are scanned
/// for `"Field":value` pairs so that JSON-like payloads still classify.
/// A `ThrottleStatus` that cannot be read as a number reads as throttled.
pub fn parse_verdict(body: &str) -> Result<Verdict, ResponseError> {
    let response = match serde_json::from_str::<CredentialTypeResponse>(body) {
        Ok(response) => response,
        Err(_) => scan_fields(body)?,
    };

    verdict(&response).ok_or(ResponseError::MissingResult)
}

fn scan_fields(body: &str) -> Result<CredentialTypeResponse, ResponseError> {
    let capture = |re: &Regex| -> Flag {
        re.captures(body)
            .and_then(|caps| caps.get(1))
            .map_or(Flag::Missing, |m| Flag::from_token(m.as_str()))
    };

    let response = CredentialTypeResponse {
        if_exists_result: capture(&IF_EXISTS_RESULT_REGEX),
        throttle_status: capture(&THROTTLE_STATUS_REGEX),
    };

    if response == CredentialTypeResponse::default() {
        return Err(ResponseError::Unparseable {
            snippet: snippet(body),
        });
    }

    Ok(response)
}

/// First [`SNIPPET_LEN`] characters of a body
pub fn snippet(body: &str) -> String {
    body.chars().take(SNIPPET_LEN).collect()
}
