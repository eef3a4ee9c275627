//! Flattening nested trees into pointer/value pairs.

use indexmap::IndexMap;
use serde_json::Value;

use crate::pointer::escape_segment;

/// Flatten `data` into pointer → leaf pairs in depth-first order.
///
/// Leaves are scalars and empty containers, so writing every pair back with
/// [`set_value`](crate::set_value) into an empty tree rebuilds `data`. A
/// scalar root flattens to a single `/` entry.
///
/// ```
/// use formbind_pointer::object_flat;
/// use serde_json::json;
///
/// let flat = object_flat(&json!({"a": {"b": 1}, "c": [true]}));
/// let keys: Vec<_> = flat.keys().map(String::as_str).collect();
/// assert_eq!(keys, ["/a/b", "/c/0"]);
/// ```
pub fn object_flat(data: &Value) -> IndexMap<String, Value> {
    let mut out = IndexMap::new();
    flatten_into(data, &mut String::new(), &mut out);
    out
}

fn flatten_into(node: &Value, prefix: &mut String, out: &mut IndexMap<String, Value>) {
    match node {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let len = prefix.len();
                prefix.push('/');
                prefix.push_str(&escape_segment(key));
                flatten_into(child, prefix, out);
                prefix.truncate(len);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                let len = prefix.len();
                prefix.push('/');
                prefix.push_str(&index.to_string());
                flatten_into(child, prefix, out);
                prefix.truncate(len);
            }
        }
        leaf => {
            let key = if prefix.is_empty() {
                "/".to_string()
            } else {
                prefix.clone()
            };
            out.insert(key, leaf.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::set_value;
    use serde_json::json;

    #[test]
    fn test_flat_depth_first_order() {
        let data = json!({
            "name": "John Doe",
            "personalData": {"age": 34, "tags": ["x", "y"]},
            "active": true
        });
        let flat = object_flat(&data);
        let pairs: Vec<(&str, &Value)> = flat.iter().map(|(k, v)| (k.as_str(), v)).collect();
        assert_eq!(
            pairs,
            vec![
                ("/name", &json!("John Doe")),
                ("/personalData/age", &json!(34)),
                ("/personalData/tags/0", &json!("x")),
                ("/personalData/tags/1", &json!("y")),
                ("/active", &json!(true)),
            ]
        );
    }

    #[test]
    fn test_flat_keeps_empty_containers_and_nulls() {
        let flat = object_flat(&json!({"list": [], "obj": {}, "n": null}));
        assert_eq!(flat.get("/list"), Some(&json!([])));
        assert_eq!(flat.get("/obj"), Some(&json!({})));
        assert_eq!(flat.get("/n"), Some(&Value::Null));
    }

    #[test]
    fn test_flat_escapes_keys() {
        let flat = object_flat(&json!({"a/b": {"c~d": 1}}));
        assert_eq!(flat.get("/a~1b/c~0d"), Some(&json!(1)));
    }

    #[test]
    fn test_flat_scalar_root() {
        let flat = object_flat(&json!(5));
        assert_eq!(flat.get("/"), Some(&json!(5)));
    }

    #[test]
    fn test_flat_rebuilds() {
        let data = json!({"a": {"b": [1, {"c": "d"}]}, "e": {}});
        let mut rebuilt = json!({});
        for (pointer, value) in object_flat(&data) {
            set_value(&mut rebuilt, &pointer, value);
        }
        assert_eq!(rebuilt, data);
    }
}
