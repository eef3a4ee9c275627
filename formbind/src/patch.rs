//! Inputs accepted by [`BindingSet::patch`](crate::BindingSet::patch).

use formbind_pointer::{object_flat, Pointer};
use indexmap::IndexMap;
use serde_json::Value;

/// A batch of writes in one of three shapes.
///
/// Converting from a [`Value`] picks the shape by inspection: an object whose
/// keys all start with `/` or `#` is a pointer map, an array of
/// `[pointer, value]` pairs is a pair list, anything else is a nested partial
/// tree.
///
/// ```
/// use formbind::PatchInput;
/// use serde_json::json;
///
/// let nested = PatchInput::from(json!({"personalData": {"age": 40}}));
/// let map = PatchInput::from(json!({"#/personalData/age": 40}));
/// assert_eq!(nested.into_pairs(), map.into_pairs());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum PatchInput {
    Nested(Value),
    Pointers(IndexMap<String, Value>),
    Pairs(Vec<(String, Value)>),
}

impl PatchInput {
    /// Normalized writes, in input order. A nested tree is flattened depth first.
    pub fn into_pairs(self) -> Vec<(Pointer, Value)> {
        match self {
            Self::Nested(tree) => object_flat(&tree)
                .into_iter()
                .map(|(pointer, value)| (Pointer::new(&pointer), value))
                .collect(),
            Self::Pointers(map) => map
                .into_iter()
                .map(|(pointer, value)| (Pointer::new(&pointer), value))
                .collect(),
            Self::Pairs(pairs) => pairs
                .into_iter()
                .map(|(pointer, value)| (Pointer::new(&pointer), value))
                .collect(),
        }
    }
}

fn is_pointer_key(key: &str) -> bool {
    key.starts_with('/') || key.starts_with('#')
}

impl From<Value> for PatchInput {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) if !map.is_empty() && map.keys().all(|k| is_pointer_key(k)) => {
                Self::Pointers(map.into_iter().collect())
            }
            Value::Array(items) if !items.is_empty() && items.iter().all(is_pair) => Self::Pairs(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Array(mut pair) => {
                            let value = pair.pop()?;
                            match pair.pop()? {
                                Value::String(pointer) => Some((pointer, value)),
                                _ => None,
                            }
                        }
                        _ => None,
                    })
                    .collect(),
            ),
            other => Self::Nested(other),
        }
    }
}

fn is_pair(item: &Value) -> bool {
    matches!(item, Value::Array(pair) if pair.len() == 2 && pair[0].is_string())
}

impl From<IndexMap<String, Value>> for PatchInput {
    fn from(map: IndexMap<String, Value>) -> Self {
        Self::Pointers(map)
    }
}

impl From<Vec<(String, Value)>> for PatchInput {
    fn from(pairs: Vec<(String, Value)>) -> Self {
        Self::Pairs(pairs)
    }
}

impl From<Vec<(&str, Value)>> for PatchInput {
    fn from(pairs: Vec<(&str, Value)>) -> Self {
        Self::Pairs(
            pairs
                .into_iter()
                .map(|(pointer, value)| (pointer.to_string(), value))
                .collect(),
        )
    }
}
