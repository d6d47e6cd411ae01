//! Canonical JSON and the `request_hash` contract.
//!
//! The hash must be stable under sensitive-field redaction and under key
//! reordering, and must change under any other change to the request. We get
//! both properties by sanitizing first, then serializing with object keys
//! sorted and with no incidental whitespace, and hashing the resulting bytes.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Key names treated as sensitive regardless of nesting depth. Matched
/// case-insensitively against the final path segment.
const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "secret",
    "token",
    "api_key",
    "apikey",
    "credential",
    "credentials",
    "authorization",
    "private_key",
    "access_token",
    "refresh_token",
    "cookie",
    "x-api-key",
    "api-key",
    "client_secret",
    "passwd",
    "pwd",
    "privatekey",
    "private-key",
    "session_id",
    "sessionid",
    "session-id",
    "auth_token",
    "authtoken",
    "auth-token",
    "bearer",
];

const REDACTED: &str = "[REDACTED]";

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SENSITIVE_KEYS.iter().any(|k| lower == *k)
}

/// Recursively replaces sensitive object values with a fixed redaction marker.
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                if is_sensitive_key(k) {
                    out.insert(k.clone(), Value::String(REDACTED.to_string()));
                } else {
                    out.insert(k.clone(), sanitize(v));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        other => other.clone(),
    }
}

/// Serializes `value` with object keys sorted lexicographically and no
/// whitespace, independent of the crate's `serde_json::Map` key ordering
/// feature — this is what makes the hash invariant to input key order.
pub fn canonical_json_string(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            out.push('{');
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key).expect("string keys always serialize"));
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Number(n) => out.push_str(&canonical_number(n)),
        other => out.push_str(&other.to_string()),
    }
}

/// Normalizes a JSON number to a canonical string form so that `1` and `1.0`
/// hash identically: an integer-valued float is written without a decimal
/// point.
fn canonical_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    if let Some(f) = n.as_f64() {
        if f.fract() == 0.0 && f.is_finite() {
            return (f as i64).to_string();
        }
        return f.to_string();
    }
    n.to_string()
}

/// Computes the stable `request_hash` for a kernel request:
/// sanitize, canonicalize, hash with SHA-256, hex-encode.
pub fn request_hash(tenant_id: &str, action: &str, params: &Value) -> String {
    let envelope = serde_json::json!({
        "tenant_id": tenant_id,
        "action": action,
        "params": sanitize(params),
    });
    let canonical = canonical_json_string(&envelope);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Redacts string error messages before they are ever persisted. Truncates to 500 chars with a `... [truncated]` suffix.
pub fn redact_error_message(message: &str) -> String {
    const SENSITIVE_TOKENS: &[&str] = &["apikey", "api_key", "token", "bearer", "password", "authorization"];
    let mut redacted = String::with_capacity(message.len());
    let mut rest = message;
    'outer: loop {
        let lower = rest.to_ascii_lowercase();
        for token in SENSITIVE_TOKENS {
            if let Some(pos) = lower.find(token) {
                let after_token = pos + token.len();
                if let Some(sep_rel) = rest[after_token..].find([':', '=']) {
                    let sep_abs = after_token + sep_rel + 1;
                    let value_start = sep_abs;
                    let value_end = rest[value_start..]
                        .find(char::is_whitespace)
                        .map(|i| value_start + i)
                        .unwrap_or(rest.len());
                    if value_end - value_start >= 6 {
                        redacted.push_str(&rest[..value_start]);
                        redacted.push_str("[REDACTED]");
                        rest = &rest[value_end..];
                        continue 'outer;
                    }
                }
            }
        }
        redacted.push_str(rest);
        break;
    }
    if redacted.chars().count() > 500 {
        let truncated: String = redacted.chars().take(500).collect();
        format!("{truncated}... [truncated]")
    } else {
        redacted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_is_stable_under_key_reordering() {
        let a = json!({"b": 2, "a": 1});
        let b = json!({"a": 1, "b": 2});
        assert_eq!(
            request_hash("tenant_1", "domain.publishers.create", &a),
            request_hash("tenant_1", "domain.publishers.create", &b)
        );
    }

    #[test]
    fn hash_is_stable_under_sensitive_field_redaction() {
        let a = json!({"name": "acme", "api_key": "sk_live_123"});
        let b = json!({"name": "acme", "api_key": "sk_live_999"});
        assert_eq!(
            request_hash("tenant_1", "domain.publishers.create", &a),
            request_hash("tenant_1", "domain.publishers.create", &b)
        );
    }

    #[test]
    fn hash_changes_on_non_sensitive_change() {
        let a = json!({"name": "acme"});
        let b = json!({"name": "other"});
        assert_ne!(
            request_hash("tenant_1", "domain.publishers.create", &a),
            request_hash("tenant_1", "domain.publishers.create", &b)
        );
    }

    #[test]
    fn hash_changes_on_different_action() {
        let params = json!({"name": "acme"});
        assert_ne!(
            request_hash("tenant_1", "domain.publishers.create", &params),
            request_hash("tenant_1", "domain.publishers.delete", &params)
        );
    }

    #[test]
    fn sanitize_redacts_nested_sensitive_keys() {
        let value = json!({"outer": {"password": "hunter2", "keep": "me"}});
        let sanitized = sanitize(&value);
        assert_eq!(sanitized["outer"]["password"], json!("[REDACTED]"));
        assert_eq!(sanitized["outer"]["keep"], json!("me"));
    }

    #[test]
    fn redacts_api_key_value() {
        let msg = "upstream rejected request: api_key=sk_live_abcdef123 invalid";
        let redacted = redact_error_message(msg);
        assert!(!redacted.contains("sk_live_abcdef123"));
        assert!(redacted.contains("[REDACTED]"));
    }

    #[test]
    fn leaves_short_values_alone() {
        let msg = "token=ab short value, not a real leak context";
        let redacted = redact_error_message(msg);
        assert!(redacted.contains("token=ab"));
    }

    #[test]
    fn hash_is_stable_across_integer_and_float_representation() {
        let a = json!({"amount": 1});
        let b = json!({"amount": 1.0});
        assert_eq!(
            request_hash("tenant_1", "domain.publishers.create", &a),
            request_hash("tenant_1", "domain.publishers.create", &b)
        );
    }

    #[test]
    fn truncates_long_messages() {
        let msg = "x".repeat(600);
        let redacted = redact_error_message(&msg);
        assert!(redacted.ends_with("... [truncated]"));
    }
}
