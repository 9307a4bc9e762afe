//! Request and result models
//!
//! This module defines the data structures passed into and returned from
//! the accessor's `get` and `set` operations.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::borrow::Cow;

use crate::error::StoreKind;

/// A value fetched from one of the stores or from the environment.
///
/// Secret strings come back as `Text`; object bodies and binary secrets
/// come back as `Bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValue {
    Text(String),
    Bytes(Vec<u8>),
}

impl EntryValue {
    /// Borrow the value as UTF-8 text, if it is valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        match self {
            EntryValue::Text(s) => Some(s),
            EntryValue::Bytes(b) => std::str::from_utf8(b).ok(),
        }
    }

    /// Text form of the value, replacing invalid UTF-8 sequences
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        match self {
            EntryValue::Text(s) => Cow::Borrowed(s),
            EntryValue::Bytes(b) => String::from_utf8_lossy(b),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            EntryValue::Text(s) => s.as_bytes(),
            EntryValue::Bytes(b) => b,
        }
    }
}

impl From<String> for EntryValue {
    fn from(value: String) -> Self {
        EntryValue::Text(value)
    }
}

impl From<&str> for EntryValue {
    fn from(value: &str) -> Self {
        EntryValue::Text(value.to_string())
    }
}

impl From<Vec<u8>> for EntryValue {
    fn from(value: Vec<u8>) -> Self {
        EntryValue::Bytes(value)
    }
}

impl Serialize for EntryValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_str() {
            Some(text) => serializer.serialize_str(text),
            None => serializer.serialize_bytes(self.as_bytes()),
        }
    }
}

/// A requested key together with its resolved value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEntry {
    /// The key exactly as requested
    pub name: String,

    /// `None` when the key is unset in local mode or the secret has no payload
    pub value: Option<EntryValue>,
}

impl ResolvedEntry {
    pub fn new(name: impl Into<String>, value: Option<EntryValue>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Input for a `get` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetRequest {
    /// Keys resolved through the secret store
    pub secret_keys: Vec<String>,

    /// Keys resolved through the blob store
    pub config_keys: Vec<String>,

    /// Mirror the resolved entries into the environment before returning
    pub set_environment: bool,
}

impl GetRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn secret_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.secret_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn config_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn set_environment(mut self, enabled: bool) -> Self {
        self.set_environment = enabled;
        self
    }
}

/// A name/value pair to write to a store.
///
/// Both fields are optional so that partially filled pairs can be passed
/// through; such pairs are skipped rather than failing the batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WritePair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl WritePair {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value.into()),
        }
    }

    /// Name and serialized payload, or `None` when either is missing.
    ///
    /// A name is missing when empty. A value is missing when it is falsy:
    /// `null`, `false`, zero or the empty string. Arrays and objects are
    /// always present, even when empty.
    pub fn validated(&self) -> Option<(&str, String)> {
        let name = self.name.as_deref().filter(|n| !n.is_empty())?;
        let payload = match self.value.as_ref()? {
            Value::Null | Value::Bool(false) => return None,
            Value::Number(n) if n.as_f64() == Some(0.0) => return None,
            Value::String(s) if s.is_empty() => return None,
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Some((name, payload))
    }
}

/// Input for a `set` call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SetRequest {
    /// Pairs written to the blob store
    pub config_pairs: Vec<WritePair>,

    /// Pairs written to the secret store
    pub secret_pairs: Vec<WritePair>,
}

impl SetRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config_pairs(mut self, pairs: impl IntoIterator<Item = WritePair>) -> Self {
        self.config_pairs = pairs.into_iter().collect();
        self
    }

    pub fn secret_pairs(mut self, pairs: impl IntoIterator<Item = WritePair>) -> Self {
        self.secret_pairs = pairs.into_iter().collect();
        self
    }
}

/// Acknowledgement returned by a store after a successful write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteAck {
    pub store: StoreKind,

    /// Object key or secret name that was written
    pub key: String,

    /// Version id or ETag reported by the store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Per-pair result of a `set` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WriteOutcome {
    Written(WriteAck),
    /// The pair lacked a name or a value; nothing was written
    Absent,
}

impl WriteOutcome {
    pub fn is_absent(&self) -> bool {
        matches!(self, WriteOutcome::Absent)
    }

    pub fn ack(&self) -> Option<&WriteAck> {
        match self {
            WriteOutcome::Written(ack) => Some(ack),
            WriteOutcome::Absent => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_values_pass_through() {
        let pair = WritePair::new("config1", "value1");
        assert_eq!(pair.validated(), Some(("config1", "value1".to_string())));
    }

    #[test]
    fn test_structured_values_are_stringified() {
        let pair = WritePair::new("config1", json!({ "retries": 3 }));
        assert_eq!(
            pair.validated(),
            Some(("config1", r#"{"retries":3}"#.to_string()))
        );

        let pair = WritePair::new("flags", json!([true, false]));
        assert_eq!(pair.validated().unwrap().1, "[true,false]");
    }

    #[test]
    fn test_missing_fields_are_invalid() {
        let no_value = WritePair {
            name: Some("moshe".to_string()),
            value: None,
        };
        assert!(no_value.validated().is_none());

        let no_name = WritePair {
            name: None,
            value: Some(json!("value")),
        };
        assert!(no_name.validated().is_none());

        assert!(WritePair::new("", "value").validated().is_none());
        assert!(WritePair::new("key", "").validated().is_none());
        assert!(WritePair::new("key", Value::Null).validated().is_none());
    }

    #[test]
    fn test_falsy_values_are_missing() {
        assert!(WritePair::new("key", false).validated().is_none());
        assert!(WritePair::new("key", 0).validated().is_none());
        assert!(WritePair::new("key", json!(0.0)).validated().is_none());

        assert_eq!(WritePair::new("key", true).validated().unwrap().1, "true");
        assert_eq!(WritePair::new("key", -1).validated().unwrap().1, "-1");
        assert_eq!(WritePair::new("key", json!([])).validated().unwrap().1, "[]");
        assert_eq!(WritePair::new("key", json!({})).validated().unwrap().1, "{}");
    }

    #[test]
    fn test_get_request_deserializes_with_defaults() {
        let request: GetRequest =
            serde_json::from_value(json!({ "secretKeys": ["db_password"] })).unwrap();
        assert_eq!(request.secret_keys, vec!["db_password"]);
        assert!(request.config_keys.is_empty());
        assert!(!request.set_environment);
    }

    #[test]
    fn test_set_request_accepts_partial_pairs() {
        let request: SetRequest =
            serde_json::from_value(json!({ "configPairs": [{ "name": "moshe" }] })).unwrap();
        assert_eq!(request.config_pairs.len(), 1);
        assert!(request.config_pairs[0].value.is_none());
        assert!(request.secret_pairs.is_empty());
    }

    #[test]
    fn test_entry_value_text_forms() {
        let bytes = EntryValue::from(b"hello".to_vec());
        assert_eq!(bytes.as_str(), Some("hello"));

        let invalid = EntryValue::Bytes(vec![0xff, 0x61]);
        assert!(invalid.as_str().is_none());
        assert_eq!(invalid.to_string_lossy(), "\u{fffd}a");
    }

    #[test]
    fn test_outcome_serialization() {
        let written = WriteOutcome::Written(WriteAck {
            store: StoreKind::Blob,
            key: "test/config1".to_string(),
            version: None,
        });
        assert_eq!(
            serde_json::to_value(&written).unwrap(),
            json!({ "status": "written", "store": "blob", "key": "test/config1" })
        );
        assert_eq!(
            serde_json::to_value(WriteOutcome::Absent).unwrap(),
            json!({ "status": "absent" })
        );
    }
}
