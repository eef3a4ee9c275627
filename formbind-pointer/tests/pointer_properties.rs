//! Property tests for pointer access

use formbind_pointer::{get_value, normalize, object_flat, set_value, Pointer};
use proptest::prelude::*;
use serde_json::{json, Value};

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,6}",
        (0usize..4).prop_map(|i| i.to_string()),
        "[a-z]{1,3}[/~][a-z]{1,3}",
    ]
}

fn pointer_segments() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(segment(), 1..5)
}

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
    ]
}

proptest! {
    /// Property: normalize is idempotent for arbitrary input
    #[test]
    fn prop_normalize_idempotent(input in ".{0,24}") {
        let once = normalize(&input);
        prop_assert_eq!(normalize(&once), once.clone());
        prop_assert!(once.starts_with('/'));
    }

    /// Property: a written value reads back, starting from any tree shape
    #[test]
    fn prop_set_then_get_roundtrip(
        segs in pointer_segments(),
        value in leaf(),
        seed in prop_oneof![Just(json!({})), Just(json!([])), Just(json!({"a": [1, 2]})), Just(json!("s"))],
    ) {
        let pointer = Pointer::from_segments(&segs);
        let mut data = seed;
        set_value(&mut data, pointer.as_str(), value.clone());
        prop_assert_eq!(get_value(&data, pointer.as_str()), Some(&value));
        prop_assert_eq!(get_value(&data, &format!("#{}", pointer)), Some(&value));
    }

    /// Property: a container value reads back deep-equal
    #[test]
    fn prop_set_container_roundtrip(segs in pointer_segments(), a in leaf(), b in leaf()) {
        let pointer = Pointer::from_segments(&segs);
        let value = json!({"x": a, "list": [b]});
        let mut data = json!({});
        set_value(&mut data, pointer.as_str(), value.clone());
        prop_assert_eq!(get_value(&data, pointer.as_str()), Some(&value));
    }

    /// Property: flattening then replaying rebuilds an object tree
    #[test]
    fn prop_flat_replay(keys in prop::collection::vec("[a-z]{1,4}", 1..6), value in leaf()) {
        let mut data = json!({});
        for (depth, key) in keys.iter().enumerate() {
            let pointer = Pointer::from_segments(&keys[..=depth]);
            if depth + 1 == keys.len() {
                set_value(&mut data, pointer.as_str(), value.clone());
            } else {
                set_value(&mut data, &pointer.join(&format!("sib{depth}")).to_string(), json!(depth));
            }
        }
        let mut rebuilt = json!({});
        for (pointer, flat_value) in object_flat(&data) {
            set_value(&mut rebuilt, &pointer, flat_value);
        }
        prop_assert_eq!(rebuilt, data);
    }
}
