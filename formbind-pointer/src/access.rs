//! Reading and writing data trees by pointer.

use serde_json::{Map, Value};
use tracing::trace;

use crate::pointer::segments;

/// Largest number of `Null` slots a single write may pad an array with.
///
/// An index further past the end than this appends instead, so a hostile or
/// mistaken pointer such as `/rows/18446744073709551615` cannot exhaust
/// memory. [`resolve_write_segments`] reports where such a write lands.
pub const MAX_INDEX_GAP: usize = 1024;

/// Resolve `pointer` against `data`.
///
/// The root (`""`, `"#"`, `"/"`) resolves to `data` itself. An absent key or
/// out-of-range index yields `None`; it never falls back to the parent
/// container.
pub fn get_value<'a>(data: &'a Value, pointer: &str) -> Option<&'a Value> {
    let mut current = data;
    for segment in segments(pointer) {
        current = match current {
            Value::Object(map) => map.get(&segment)?,
            Value::Array(items) => items.get(parse_index(&segment)?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Mutable variant of [`get_value`]. Does not create anything.
pub fn get_value_mut<'a>(data: &'a mut Value, pointer: &str) -> Option<&'a mut Value> {
    let mut current = data;
    for segment in segments(pointer) {
        current = match current {
            Value::Object(map) => map.get_mut(&segment)?,
            Value::Array(items) => items.get_mut(parse_index(&segment)?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Write `value` at `pointer`, creating missing containers on the way.
///
/// Intermediate containers are arrays when the following segment is an index
/// (or `-`), objects otherwise. A node that cannot hold the next segment (a
/// scalar, or an array addressed by a name) is replaced. Writing the root
/// replaces `data`. Indices more than [`MAX_INDEX_GAP`] past the end of an
/// array append.
pub fn set_value(data: &mut Value, pointer: &str, value: Value) {
    trace!(pointer, "set value");
    let mut current = data;
    for segment in segments(pointer) {
        current = step(current, &segment);
    }
    *current = value;
}

fn step<'a>(node: &'a mut Value, segment: &str) -> &'a mut Value {
    let fits = match node {
        Value::Object(_) => true,
        Value::Array(items) => array_slot(items.len(), segment).is_some(),
        _ => false,
    };
    if !fits {
        *node = empty_container_for(segment);
    }

    match node {
        Value::Array(items) => {
            let index = array_slot(items.len(), segment).unwrap_or(items.len());
            if index >= items.len() {
                items.resize(index.saturating_add(1), Value::Null);
            }
            &mut items[index]
        }
        Value::Object(map) => map.entry(segment.to_string()).or_insert(Value::Null),
        // unreachable: `fits` replaced every non-container above
        other => other,
    }
}

fn empty_container_for(segment: &str) -> Value {
    if segment == "-" || parse_index(segment).is_some() {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

/// The segments a [`set_value`] of `pointer` on `data` actually writes to.
///
/// `-` and indices beyond [`MAX_INDEX_GAP`] come back as the concrete index
/// they land on, so the result can be replayed against the same tree.
///
/// ```
/// use formbind_pointer::resolve_write_segments;
/// use serde_json::json;
///
/// let data = json!({"tags": ["a"]});
/// assert_eq!(resolve_write_segments(&data, "/tags/-"), vec!["tags", "1"]);
/// assert_eq!(resolve_write_segments(&data, "/tags/99999999999"), vec!["tags", "1"]);
/// ```
pub fn resolve_write_segments(data: &Value, pointer: &str) -> Vec<String> {
    let mut current = Some(data);
    let mut resolved = Vec::new();
    for segment in segments(pointer) {
        let (next, landed) = match current {
            Some(Value::Object(map)) => (map.get(&segment), segment),
            Some(Value::Array(items)) => match array_slot(items.len(), &segment) {
                Some(index) => (items.get(index), index.to_string()),
                None => (None, segment),
            },
            // Replaced by a fresh container on write.
            _ => match array_slot(0, &segment) {
                Some(index) => (None, index.to_string()),
                None => (None, segment),
            },
        };
        current = next;
        resolved.push(landed);
    }
    resolved
}

/// Index an array write lands on: `-` appends, digits address directly
/// unless they are more than [`MAX_INDEX_GAP`] past the end.
fn array_slot(len: usize, segment: &str) -> Option<usize> {
    if segment == "-" {
        return Some(len);
    }
    let index = parse_index(segment)?;
    if index > len.saturating_add(MAX_INDEX_GAP) {
        Some(len)
    } else {
        Some(index)
    }
}

fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}
