//! Data pointer to JSON-Schema pointer translation.
//!
//! Schema-aware layers look up the schema node describing a data location:
//! every named segment becomes `/properties/<name>` and every index collapses
//! to `/items`.

use serde_json::Value;

use crate::access::get_value;
use crate::pointer::{escape_segment, segments};

/// Translate a data pointer into the pointer of its schema node.
///
/// ```
/// use formbind_pointer::schema_pointer;
///
/// assert_eq!(schema_pointer("#/rows/3/name"), "/properties/rows/items/properties/name");
/// assert_eq!(schema_pointer("#"), "/");
/// ```
pub fn schema_pointer(pointer: &str) -> String {
    let mut out = String::new();
    for segment in segments(pointer) {
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            out.push_str("/items");
        } else {
            out.push_str("/properties/");
            out.push_str(&escape_segment(&segment));
        }
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Resolve the schema node describing the data at `pointer`.
pub fn get_schema_value<'a>(schema: &'a Value, pointer: &str) -> Option<&'a Value> {
    get_value(schema, &schema_pointer(pointer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_lookup() {
        let schema = json!({
            "type": "object",
            "properties": {
                "personalData": {
                    "type": "object",
                    "properties": {"age": {"type": "integer", "minimum": 18}}
                },
                "tags": {"type": "array", "items": {"type": "string"}}
            }
        });
        assert_eq!(
            get_schema_value(&schema, "#/personalData/age"),
            Some(&json!({"type": "integer", "minimum": 18}))
        );
        assert_eq!(
            get_schema_value(&schema, "/tags/7"),
            Some(&json!({"type": "string"}))
        );
        assert_eq!(get_schema_value(&schema, "/nope"), None);
        assert_eq!(get_schema_value(&schema, "#"), Some(&schema));
    }

    #[test]
    fn test_schema_pointer_escapes() {
        assert_eq!(schema_pointer("/a~1b"), "/properties/a~1b");
    }
}
