//! Property-based tests for the boundary splitter
//!
//! Splitting a list and parsing every boundary must give back exactly the
//! elements an eager parse of the whole document produces.

use proptest::prelude::*;
use stencil_core::{JsonFlags, Key, ScalarKind, Value};
use stencil_json::{parse_at, parse_value, split_dict, split_list};
use std::io::Cursor;

// Strategy: JSON trees of bounded depth (no floats, their text form is not unique)
fn arb_json() -> impl Strategy<Value = serde_json::Value> {
    let leaf = prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::Bool),
        any::<i64>().prop_map(|i| serde_json::Value::Number(i.into())),
        ".*".prop_map(serde_json::Value::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(serde_json::Value::Array),
            prop::collection::btree_map("[a-z\\[\\]{},:\"]{0,6}", inner, 0..6)
                .prop_map(|m| serde_json::Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    /// Property: every list element is found exactly once, in order
    #[test]
    fn proptest_split_list_matches_eager_parse(
        items in prop::collection::vec(arb_json(), 0..8),
        pretty in any::<bool>()
    ) {
        let document = serde_json::Value::Array(items.clone());
        let text = if pretty {
            serde_json::to_string_pretty(&document).unwrap()
        } else {
            serde_json::to_string(&document).unwrap()
        };
        let mut resource = Cursor::new(text.clone().into_bytes());

        let boundaries: Vec<_> = split_list(&mut resource, 0, None)
            .unwrap()
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        prop_assert_eq!(boundaries.len(), items.len());
        for (boundary, item) in boundaries.into_iter().zip(items) {
            let parsed = parse_at(&mut resource, boundary, JsonFlags::empty()).unwrap();
            prop_assert_eq!(parsed, Value::from_json(item));
        }

        let eager = parse_value(&mut text.as_bytes(), JsonFlags::empty()).unwrap();
        prop_assert_eq!(eager, Value::from_json(document));
    }

    /// Property: dict entries keep their keys and value ranges
    #[test]
    fn proptest_split_dict_matches_eager_parse(
        entries in prop::collection::btree_map(".*", arb_json(), 0..8)
    ) {
        let text = serde_json::to_string(&entries).unwrap();
        let mut resource = Cursor::new(text.into_bytes());

        let split: Vec<_> = split_dict(&mut resource, 0, None, ScalarKind::String)
            .unwrap()
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        prop_assert_eq!(split.len(), entries.len());
        for ((key, boundary), (name, item)) in split.into_iter().zip(entries) {
            prop_assert_eq!(key, Key::String(name));
            let parsed = parse_at(&mut resource, boundary, JsonFlags::empty()).unwrap();
            prop_assert_eq!(parsed, Value::from_json(item));
        }
    }
}
