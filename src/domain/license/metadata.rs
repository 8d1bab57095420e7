//! Reserved license metadata keys and helpers over the open metadata object

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

pub const DEVICE_ID: &str = "device_id";
pub const USER_ID: &str = "user_id";
pub const IP_ADDRESS: &str = "ip_address";
pub const LAST_VALIDATED_AT: &str = "last_validated_at";
pub const FEATURES: &str = "features";
pub const LIMITS: &str = "limits";
pub const LAST_IP: &str = "last_ip";

/// Keys copied from license metadata into a successful validation response
pub const ALLOWED_DATA_KEYS: [&str; 2] = [FEATURES, LIMITS];

/// Non-empty string value stored under `key`
pub fn non_empty_str<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

/// Identity claims an agent presents alongside a license key.
///
/// Anything that is not a JSON object, or a claim that is not a non-empty
/// string, counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentMetadata {
    pub device_id: Option<String>,
    pub user_id: Option<String>,
    pub ip_address: Option<String>,
}

impl AgentMetadata {
    pub fn from_value(value: Option<&Value>) -> Self {
        let Some(object) = value.and_then(Value::as_object) else {
            return Self::default();
        };

        let claim = |key| non_empty_str(object, key).map(str::to_string);

        Self {
            device_id: claim(DEVICE_ID),
            user_id: claim(USER_ID),
            ip_address: claim(IP_ADDRESS),
        }
    }
}

/// Whitelisted subset of license metadata exposed to agents.
///
/// Returns `None` when none of the whitelisted keys are present.
pub fn allowed_data(license_metadata: Option<&Map<String, Value>>) -> Option<Value> {
    let object = license_metadata?;

    let allowed: Map<String, Value> = ALLOWED_DATA_KEYS
        .iter()
        .filter_map(|key| object.get(*key).map(|value| (key.to_string(), value.clone())))
        .collect();

    (!allowed.is_empty()).then_some(Value::Object(allowed))
}

/// Merge validation bookkeeping into a metadata snapshot.
///
/// A snapshot that is missing or not an object is replaced by a fresh object;
/// every other key passes through untouched.
pub fn merge_enrichment(
    base: Option<&Value>,
    validated_at: DateTime<Utc>,
    last_ip: Option<&str>,
) -> Value {
    let mut merged = base
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    merged.insert(
        LAST_VALIDATED_AT.to_string(),
        Value::String(validated_at.to_rfc3339_opts(SecondsFormat::Nanos, true)),
    );

    if let Some(ip) = last_ip {
        merged.insert(LAST_IP.to_string(), Value::String(ip.to_string()));
    }

    Value::Object(merged)
}
