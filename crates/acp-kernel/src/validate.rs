//! Parameter schema validation against the JSON-Schema subset in
//! [`acp_types::ParamSchema`].

use acp_types::ParamSchema;
use serde_json::Value;

use crate::error::{Result, RouterError};

pub fn validate(schema: &ParamSchema, value: &Value, path: &str) -> Result<()> {
    match schema {
        ParamSchema::Object { properties, required } => {
            let Value::Object(map) = value else {
                return Err(RouterError::ValidationError(format!("{path}: expected object")));
            };
            for key in required {
                if !map.contains_key(key) {
                    return Err(RouterError::ValidationError(format!(
                        "{path}.{key}: required field missing"
                    )));
                }
            }
            for (key, child_schema) in properties {
                if let Some(child_value) = map.get(key) {
                    validate(child_schema, child_value, &format!("{path}.{key}"))?;
                }
            }
            Ok(())
        }
        ParamSchema::String { enum_values } => {
            let Value::String(s) = value else {
                return Err(RouterError::ValidationError(format!("{path}: expected string")));
            };
            if let Some(allowed) = enum_values {
                if !allowed.contains(s) {
                    return Err(RouterError::ValidationError(format!(
                        "{path}: must be one of {allowed:?}"
                    )));
                }
            }
            Ok(())
        }
        ParamSchema::Number { minimum, maximum } => {
            let Some(n) = value.as_f64() else {
                return Err(RouterError::ValidationError(format!("{path}: expected number")));
            };
            if let Some(min) = minimum {
                if n < *min {
                    return Err(RouterError::ValidationError(format!("{path}: below minimum {min}")));
                }
            }
            if let Some(max) = maximum {
                if n > *max {
                    return Err(RouterError::ValidationError(format!("{path}: above maximum {max}")));
                }
            }
            Ok(())
        }
        ParamSchema::Bool => {
            if value.as_bool().is_none() {
                return Err(RouterError::ValidationError(format!("{path}: expected bool")));
            }
            Ok(())
        }
        ParamSchema::Array { items } => {
            let Value::Array(arr) = value else {
                return Err(RouterError::ValidationError(format!("{path}: expected array")));
            };
            for (i, item) in arr.iter().enumerate() {
                validate(items, item, &format!("{path}[{i}]"))?;
            }
            Ok(())
        }
    }
}

/// Projects the action-defined allowlist of top-level keys out of `params`,
/// never nested bodies.
pub fn project_summary(params: &Value, keys: &[String]) -> Value {
    let mut out = serde_json::Map::new();
    if let Value::Object(map) = params {
        for key in keys {
            if let Some(v) = map.get(key) {
                out.insert(key.clone(), v.clone());
            }
        }
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_field_missing_fails() {
        let schema = ParamSchema::object([("name".to_string(), ParamSchema::string())], &["name"]);
        let err = validate(&schema, &json!({}), "params").unwrap_err();
        assert!(matches!(err, RouterError::ValidationError(_)));
    }

    #[test]
    fn enum_mismatch_fails() {
        let schema = ParamSchema::string_enum(&["a", "b"]);
        assert!(validate(&schema, &json!("c"), "params").is_err());
        assert!(validate(&schema, &json!("a"), "params").is_ok());
    }

    #[test]
    fn summary_projects_only_listed_keys() {
        let params = json!({"name": "acme", "secret": "x"});
        let summary = project_summary(&params, &["name".to_string()]);
        assert_eq!(summary, json!({"name": "acme"}));
    }
}
