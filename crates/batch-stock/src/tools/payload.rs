//! Typed view over provider payloads
//!
//! Providers answer with loosely shaped JSON. A payload that carries an
//! `error` key (or is not an object at all) is a failure; everything else is
//! a field map.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of one analysis type for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// Provider signalled a failure
    Failed { error: String },
    /// Named result fields
    Ok(Map<String, Value>),
}

impl Payload {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => match map.get("error") {
                Some(Value::String(error)) => Payload::Failed {
                    error: error.clone(),
                },
                Some(other) => Payload::Failed {
                    error: other.to_string(),
                },
                None => Payload::Ok(map),
            },
            Value::Null => Payload::failed("empty result"),
            other => Payload::failed(format!("unexpected payload format: {other}")),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Payload::Failed {
            error: error.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Payload::Ok(_))
    }

    /// Error message of a failed payload
    pub fn error(&self) -> Option<&str> {
        match self {
            Payload::Failed { error } => Some(error),
            Payload::Ok(_) => None,
        }
    }

    /// Fields of a successful payload
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        match self {
            Payload::Ok(map) => Some(map),
            Payload::Failed { .. } => None,
        }
    }

    /// Top-level field of a successful payload
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields().and_then(|m| m.get(key))
    }

    /// True when the payload carries an `ai_analysis` object without an error
    pub fn has_ai_analysis(&self) -> bool {
        matches!(
            self.get("ai_analysis"),
            Some(Value::Object(ai)) if !ai.contains_key("error")
        )
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value() {
        let ok = Payload::from_value(json!({"current_price": 1700.5}));
        assert!(ok.is_ok());
        assert_eq!(ok.get("current_price"), Some(&json!(1700.5)));

        let failed = Payload::from_value(json!({"error": "no quotes found", "symbol": "X"}));
        assert_eq!(failed.error(), Some("no quotes found"));

        let odd = Payload::from_value(json!({"error": {"code": 500}}));
        assert_eq!(odd.error(), Some(r#"{"code":500}"#));

        assert!(!Payload::from_value(Value::Null).is_ok());
        assert!(!Payload::from_value(json!([1, 2])).is_ok());
    }

    #[test]
    fn test_has_ai_analysis() {
        let with_ai = Payload::from_value(json!({"ai_analysis": {"report": "看多"}}));
        assert!(with_ai.has_ai_analysis());

        let ai_failed = Payload::from_value(json!({"ai_analysis": {"error": "LLM down"}}));
        assert!(!ai_failed.has_ai_analysis());

        let no_ai = Payload::from_value(json!({"news_count": 3}));
        assert!(!no_ai.has_ai_analysis());
        assert!(!Payload::failed("x").has_ai_analysis());
    }

    #[test]
    fn test_serialized_form_is_untagged() {
        let failed = serde_json::to_value(Payload::failed("boom")).unwrap();
        assert_eq!(failed, json!({"error": "boom"}));

        let ok = serde_json::to_value(Payload::from_value(json!({"a": 1}))).unwrap();
        assert_eq!(ok, json!({"a": 1}));

        let back: Payload = serde_json::from_value(json!({"error": "boom"})).unwrap();
        assert_eq!(back, Payload::failed("boom"));
        let back: Payload = serde_json::from_value(json!({"a": 1})).unwrap();
        assert!(back.is_ok());
    }
}
