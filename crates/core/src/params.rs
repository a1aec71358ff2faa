//! Pure helper functions for extracting typed parameters from a
//! `serde_json::Value` object.
//!
//! Each helper takes a JSON value, a key name, and a default. If the key
//! is missing or the value has the wrong type, the default is returned.
//! These never fail; out-of-range values are handled separately by each
//! engine's sanitize step.

use serde_json::Value;

/// Extracts an `f64` from `params[name]`, returning `default` if missing
/// or wrong type. Accepts integer JSON numbers as well.
pub fn param_f64(params: &Value, name: &str, default: f64) -> f64 {
    params.get(name).and_then(Value::as_f64).unwrap_or(default)
}

/// Extracts a `bool` from `params[name]`, returning `default` if missing
/// or wrong type.
pub fn param_bool(params: &Value, name: &str, default: bool) -> bool {
    params.get(name).and_then(Value::as_bool).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -- param_f64 --

    #[test]
    fn param_f64_extracts_existing_float() {
        let params = json!({"coverage": 2.5});
        assert!((param_f64(&params, "coverage", 1.0) - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn param_f64_extracts_integer_as_float() {
        let params = json!({"coverage": 10});
        assert!((param_f64(&params, "coverage", 0.0) - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn param_f64_returns_default_when_key_missing() {
        let params = json!({"other": 1.0});
        assert!((param_f64(&params, "coverage", 3.0) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn param_f64_returns_default_when_wrong_type() {
        let params = json!({"coverage": "lots"});
        assert!((param_f64(&params, "coverage", 1.0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn param_f64_returns_default_for_non_object() {
        let params = json!("not an object");
        assert!((param_f64(&params, "coverage", 7.0) - 7.0).abs() < f64::EPSILON);
    }

    // -- param_bool --

    #[test]
    fn param_bool_extracts_true_and_false() {
        assert!(param_bool(&json!({"sample_rms": true}), "sample_rms", false));
        assert!(!param_bool(&json!({"sample_rms": false}), "sample_rms", true));
    }

    #[test]
    fn param_bool_returns_default_when_key_missing() {
        assert!(param_bool(&json!({}), "sample_rms", true));
    }

    #[test]
    fn param_bool_returns_default_for_wrong_type() {
        assert!(!param_bool(&json!({"sample_rms": 1}), "sample_rms", false));
    }
}
