use serde_json::Value;

use crate::literal;

/// Flatten an arbitrary tool-output payload into a single JSON-encodable
/// string without double-encoding:
///
/// - a single-entry map unwraps to its sole value;
/// - structured values (maps/sequences) are encoded exactly once;
/// - strings that are already valid JSON pass through unchanged;
/// - strings that parse under the permissive literal grammar are
///   re-encoded as JSON;
/// - everything else is stringified verbatim.
pub fn normalize_tool_output(outputs: &Value) -> String {
    let mut content = outputs;
    if let Value::Object(map) = outputs {
        if map.len() == 1 {
            if let Some(inner) = map.values().next() {
                content = inner;
            }
        }
    }

    match content {
        Value::Object(_) | Value::Array(_) => content.to_string(),
        Value::String(s) => normalize_string(s),
        scalar => scalar.to_string(),
    }
}

fn normalize_string(s: &str) -> String {
    if serde_json::from_str::<Value>(s).is_ok() {
        return s.to_string();
    }
    match literal::parse(s) {
        Some(value) => value.to_string(),
        None => s.to_string(),
    }
}

/// Escape markup-significant characters in user/model-authored text so
/// renderers that treat content as HTML-like cannot be injected into.
pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_key_map_unwraps() {
        let out = normalize_tool_output(&json!({"weather_result": {"temp": 20}}));
        assert_eq!(out, r#"{"temp":20}"#);
    }

    #[test]
    fn multi_key_map_stays_wrapped() {
        let out = normalize_tool_output(&json!({"a": 1, "b": 2}));
        assert_eq!(serde_json::from_str::<Value>(&out).unwrap(), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn json_string_passes_through_unchanged() {
        let out = normalize_tool_output(&json!("[1,2,3]"));
        assert_eq!(out, "[1,2,3]");
    }

    #[test]
    fn unwrapped_json_string_is_not_rewrapped() {
        let out = normalize_tool_output(&json!({"result": "[1,2,3]"}));
        assert_eq!(out, "[1,2,3]");
    }

    #[test]
    fn literal_string_is_reencoded_as_json() {
        let out = normalize_tool_output(&json!("{'x': 1}"));
        assert_eq!(out, r#"{"x":1}"#);
    }

    #[test]
    fn plain_string_is_verbatim() {
        assert_eq!(normalize_tool_output(&json!("hello")), "hello");
    }

    #[test]
    fn scalars_render_as_json_text() {
        assert_eq!(normalize_tool_output(&json!(20)), "20");
        assert_eq!(normalize_tool_output(&json!(true)), "true");
        assert_eq!(normalize_tool_output(&json!(null)), "null");
    }

    #[test]
    fn single_key_scalar_unwraps() {
        assert_eq!(normalize_tool_output(&json!({"count": 7})), "7");
        assert_eq!(normalize_tool_output(&json!({"note": "plain"})), "plain");
    }

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(escape_text("<script>"), "&lt;script&gt;");
        assert_eq!(escape_text("a & b"), "a &amp; b");
        assert_eq!(escape_text("plain"), "plain");
    }

    #[test]
    fn escape_orders_ampersand_first() {
        assert_eq!(escape_text("&lt;"), "&amp;lt;");
    }
}
