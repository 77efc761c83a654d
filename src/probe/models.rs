//! Probe request, response and result models

use crate::proxy::models::Route;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Body of a `GetCredentialType` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialTypeRequest {
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "isOtherIdpSupported")]
    pub is_other_idp_supported: bool,
}

impl CredentialTypeRequest {
    pub fn new(address: &str) -> Self {
        Self {
            username: address.to_string(),
            is_other_idp_supported: true,
        }
    }
}

/// An integer-like response field. The service has been seen sending these
/// as numbers, booleans and numeric strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flag {
    /// The key is not in the payload
    #[default]
    Missing,
    Value(i64),
    /// The key is present but its value is not a number, bool or numeric string
    Unreadable,
}

impl Flag {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Bool(b) => Flag::Value(i64::from(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(v) => Flag::Value(v),
                None => n
                    .as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .map_or(Flag::Unreadable, |f| Flag::Value(f as i64)),
            },
            Value::String(s) => Self::from_token(s),
            _ => Flag::Unreadable,
        }
    }

    /// Read a bare token such as `1`, `true` or `"0"`
    pub fn from_token(token: &str) -> Self {
        let token = token.trim();
        let token = token
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .unwrap_or(token)
            .trim();

        match token.to_ascii_lowercase().as_str() {
            "true" => Flag::Value(1),
            "false" => Flag::Value(0),
            other => other.parse().map_or(Flag::Unreadable, Flag::Value),
        }
    }
}

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Flag::from_json(&value))
    }
}

/// The two fields of a `GetCredentialType` response the prober reads.
/// Everything else in the payload is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct CredentialTypeResponse {
    #[serde(rename = "IfExistsResult", default)]
    pub if_exists_result: Flag,
    #[serde(rename = "ThrottleStatus", default)]
    pub throttle_status: Flag,
}

/// Terminal classification for one address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationOutcome {
    /// The tenant reported the account exists
    Valid,
    /// The tenant reported no such account
    Invalid,
    /// Every route was tried without a trustworthy answer
    Undetermined,
}

impl ValidationOutcome {
    pub fn is_conclusive(&self) -> bool {
        matches!(self, Self::Valid | Self::Invalid)
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => f.write_str("VALID"),
            Self::Invalid => f.write_str("INVALID"),
            Self::Undetermined => f.write_str("COULD NOT VALIDATE"),
        }
    }
}

/// One line of output: what happened to an address and through which route
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeRecord {
    pub address: String,
    pub outcome: ValidationOutcome,
    #[serde(serialize_with = "serialize_route")]
    pub route: Route,
    /// Number of requests issued for this address
    pub attempts: u32,
}

impl ProbeRecord {
    pub fn new(address: String, outcome: ValidationOutcome, route: Route, attempts: u32) -> Self {
        Self {
            address,
            outcome,
            route,
            attempts,
        }
    }
}

fn serialize_route<S: Serializer>(route: &Route, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(route)
}

impl fmt::Display for ProbeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            ValidationOutcome::Undetermined => write!(
                f,
                "{} - {} (via {}, all methods exhausted after {} attempts)",
                self.address, self.outcome, self.route, self.attempts
            ),
            _ => write!(f, "{} - {} (via {})", self.address, self.outcome, self.route),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::{Proxy, ProxyType};

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(CredentialTypeRequest::new("user@tenant.com")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"Username": "user@tenant.com", "isOtherIdpSupported": true})
        );
    }

    #[test]
    fn test_response_ignores_extra_fields() {
        let body = r#"{"Username":"a@b.c","Display":"a@b.c","IfExistsResult":1,"ThrottleStatus":0,"Credentials":{"PrefCredential":1}}"#;
        let response: CredentialTypeResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.if_exists_result, Flag::Value(1));
        assert_eq!(response.throttle_status, Flag::Value(0));
    }

    #[test]
    fn test_response_missing_fields_default() {
        let response: CredentialTypeResponse =
            serde_json::from_str(r#"{"Username":"a@b.c"}"#).unwrap();
        assert_eq!(response, CredentialTypeResponse::default());
    }

    #[test]
    fn test_flag_reads_bools_numbers_and_strings() {
        assert_eq!(Flag::from_json(&serde_json::json!(true)), Flag::Value(1));
        assert_eq!(Flag::from_json(&serde_json::json!(false)), Flag::Value(0));
        assert_eq!(Flag::from_json(&serde_json::json!(2)), Flag::Value(2));
        assert_eq!(Flag::from_json(&serde_json::json!(1.0)), Flag::Value(1));
        assert_eq!(Flag::from_json(&serde_json::json!("1")), Flag::Value(1));
        assert_eq!(Flag::from_json(&serde_json::json!(" 0 ")), Flag::Value(0));
        assert_eq!(Flag::from_json(&serde_json::json!("True")), Flag::Value(1));
    }

    #[test]
    fn test_flag_unreadable_values() {
        assert_eq!(Flag::from_json(&serde_json::json!(null)), Flag::Unreadable);
        assert_eq!(Flag::from_json(&serde_json::json!("maybe")), Flag::Unreadable);
        assert_eq!(Flag::from_json(&serde_json::json!(0.5)), Flag::Unreadable);
        assert_eq!(Flag::from_json(&serde_json::json!({"a": 1})), Flag::Unreadable);
    }

    #[test]
    fn test_flag_from_token() {
        assert_eq!(Flag::from_token("1"), Flag::Value(1));
        assert_eq!(Flag::from_token(r#""1""#), Flag::Value(1));
        assert_eq!(Flag::from_token("false"), Flag::Value(0));
        assert_eq!(Flag::from_token("null"), Flag::Unreadable);
    }

    #[test]
    fn test_record_display() {
        let proxy = Proxy::new("10.0.0.2".to_string(), 8080, ProxyType::Http);
        let record = ProbeRecord::new(
            "user@tenant.com".to_string(),
            ValidationOutcome::Valid,
            Route::Proxy(proxy),
            2,
        );
        assert_eq!(record.to_string(), "user@tenant.com - VALID (via http://10.0.0.2:8080)");

        let record = ProbeRecord::new(
            "x@tenant.com".to_string(),
            ValidationOutcome::Undetermined,
            Route::Direct,
            4,
        );
        assert_eq!(
            record.to_string(),
            "x@tenant.com - COULD NOT VALIDATE (via direct, all methods exhausted after 4 attempts)"
        );
    }

    #[test]
    fn test_record_json() {
        let record = ProbeRecord::new(
            "bad@tenant.com".to_string(),
            ValidationOutcome::Invalid,
            Route::Direct,
            1,
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "address": "bad@tenant.com",
                "outcome": "invalid",
                "route": "direct",
                "attempts": 1
            })
        );
    }

    #[test]
    fn test_outcome_is_conclusive() {
        assert!(ValidationOutcome::Valid.is_conclusive());
        assert!(ValidationOutcome::Invalid.is_conclusive());
        assert!(!ValidationOutcome::Undetermined.is_conclusive());
    }
}
