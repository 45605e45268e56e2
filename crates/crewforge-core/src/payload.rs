use serde_json::Value;

/// Decode raw worker output as JSON, falling back to the raw text.
///
/// Worker output is opaque; callers at the boundary use this to surface
/// structure when there is some, and must never fail on plain text.
pub fn parse_payload(raw: &str) -> Value {
    serde_json::from_str(raw.trim()).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Number of items in a decoded payload: array or object length, zero for
/// null, one for any scalar.
pub fn count_items(value: &Value) -> usize {
    match value {
        Value::Null => 0,
        Value::Array(items) => items.len(),
        Value::Object(fields) => fields.len(),
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_payload_json() {
        assert_eq!(parse_payload(r#"{"trends": [1, 2]}"#), json!({"trends": [1, 2]}));
        assert_eq!(parse_payload(" [1, 2, 3]\n"), json!([1, 2, 3]));
    }

    #[test]
    fn test_parse_payload_plain_text() {
        let raw = "Top trend: short-form tutorials";
        assert_eq!(parse_payload(raw), Value::String(raw.to_string()));
    }

    #[test]
    fn test_count_items() {
        assert_eq!(count_items(&json!([1, 2, 3])), 3);
        assert_eq!(count_items(&json!({"a": 1, "b": 2})), 2);
        assert_eq!(count_items(&json!("text")), 1);
        assert_eq!(count_items(&json!(42)), 1);
        assert_eq!(count_items(&Value::Null), 0);
    }
}
