// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for JSON Pointer Evaluation

use cim_deployment::domain::{evaluate_pointer, ProviderDocument};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-z0-9 ]{0,8}".prop_map(Value::String),
    ]
}

proptest! {
    /// The empty pointer yields the whole document
    #[test]
    fn prop_empty_pointer_is_identity(value in leaf(), key in "[a-z]{1,6}") {
        let document = json!({ key: value });
        prop_assert_eq!(evaluate_pointer(&document, "").unwrap(), &document);
    }

    /// Escaped keys, including `~` and `/`, address the member they name
    #[test]
    fn prop_escaped_keys_round_trip(
        path in prop::collection::vec("[a-z~/]{1,6}", 1..5),
        value in leaf(),
    ) {
        let document = path.iter().rev().fold(value.clone(), |inner, key| {
            let mut map = Map::new();
            map.insert(key.clone(), inner);
            Value::Object(map)
        });
        let pointer: String = path.iter().map(|key| format!("/{}", escape(key))).collect();

        prop_assert_eq!(evaluate_pointer(&document, &pointer).unwrap(), &value);
    }

    /// Array indices address elements and reject anything out of range
    #[test]
    fn prop_array_indices(items in prop::collection::vec(leaf(), 0..8), index in 0usize..10) {
        let document = json!({ "items": items.clone() });
        let result = evaluate_pointer(&document, &format!("/items/{}", index));

        match items.get(index) {
            Some(expected) => prop_assert_eq!(result.unwrap(), expected),
            None => prop_assert!(result.is_err()),
        }
    }

    /// Property bags and raw documents evaluate alike
    #[test]
    fn prop_property_bag_matches_raw_document(key in "[a-z]{1,6}", value in leaf()) {
        let mut map = Map::new();
        map.insert(key.clone(), value.clone());

        let bag = ProviderDocument::Properties(map.clone());
        let raw = ProviderDocument::Raw(Value::Object(map));
        let pointer = format!("/{}", key);

        prop_assert_eq!(bag.pointer(&pointer).unwrap(), raw.pointer(&pointer).unwrap());
        prop_assert_eq!(bag.property(&key), Some(&value));
    }

    /// Pointers without a leading slash are malformed
    #[test]
    fn prop_unrooted_pointers_are_malformed(pointer in "[a-z][a-z/]{0,8}") {
        let empty = json!({});
        prop_assert!(evaluate_pointer(&empty, &pointer).is_err());
    }
}
