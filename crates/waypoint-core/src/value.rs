//! Typed accessors over untyped JSON values (panic-free).
//!
//! Every policy response arrives as `serde_json::Value`. These helpers turn
//! shape checks into `WaypointError`s that name the offending field.

use serde_json::{Map, Value};

use crate::error::{Result, WaypointError};

/// Short JSON type name for error messages.
pub fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Integer view of a JSON number. Floats are accepted only when they carry no
/// fractional part (JSON encoders commonly emit `80.0` for `80`).
pub fn as_integer(v: &Value) -> Option<i64> {
    let n = v.as_number()?;
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    if n.is_u64() {
        return None; // above i64::MAX
    }
    let f = n.as_f64()?;
    if f.fract() != 0.0 || !f.is_finite() || f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return None;
    }
    Some(f as i64)
}

/// Required string field.
pub fn required_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    let v = obj
        .get(key)
        .ok_or_else(|| WaypointError::validation(format!("expected {key}")))?;
    v.as_str().ok_or_else(|| {
        WaypointError::validation(format!("{key} should be a string, got {}", type_name(v)))
    })
}

/// Optional string field; absent is `None`, present-but-not-string is an error.
pub fn optional_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<Option<&'a str>> {
    match obj.get(key) {
        None => Ok(None),
        Some(v) => v.as_str().map(Some).ok_or_else(|| {
            WaypointError::validation(format!("{key} should be a string, got {}", type_name(v)))
        }),
    }
}

/// Required integer-valued number field.
pub fn required_integer(obj: &Map<String, Value>, key: &str) -> Result<i64> {
    let v = obj
        .get(key)
        .ok_or_else(|| WaypointError::validation(format!("expected {key}")))?;
    as_integer(v).ok_or_else(|| WaypointError::validation(format!("{key} should be an integer, got {v}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_view() {
        assert_eq!(as_integer(&json!(80)), Some(80));
        assert_eq!(as_integer(&json!(80.0)), Some(80));
        assert_eq!(as_integer(&json!(-1)), Some(-1));
        assert_eq!(as_integer(&json!(3.5)), None);
        assert_eq!(as_integer(&json!("80")), None);
        assert_eq!(as_integer(&json!(u64::MAX)), None);
    }

    #[test]
    fn string_fields() {
        let obj = json!({"a": "x", "b": 1});
        let obj = obj.as_object().unwrap();
        assert_eq!(required_str(obj, "a").unwrap(), "x");
        assert!(required_str(obj, "b").is_err());
        assert!(required_str(obj, "c").is_err());
        assert_eq!(optional_str(obj, "c").unwrap(), None);
        assert!(optional_str(obj, "b").is_err());
    }
}
