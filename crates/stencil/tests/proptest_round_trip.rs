//! Property-based tests for encode/decode round trips
//!
//! Decoding what the encoder wrote must give back the original value, under
//! both decode strategies.

use indexmap::IndexMap;
use proptest::prelude::*;
use stencil::{ClassRegistry, Config, Formatters, Key, Object, Stencil, Type, Value};
use stencil::Strategy as DecodeStrategy;

const SCHEMA: &str = r#"
[classes.Reading]
fields = [
    { name = "id", type = "int" },
    { name = "label", type = "string", wire_name = "name" },
    { name = "score", type = "?float" },
    { name = "tags", type = "dict<string, bool>" },
]
"#;

fn stencil(strategy: DecodeStrategy) -> Stencil<ClassRegistry> {
    Stencil::new(
        ClassRegistry::from_toml_str(SCHEMA).unwrap(),
        Formatters::new(),
        Config::new().with_strategy(strategy),
    )
}

fn arb_reading() -> impl Strategy<Value = Value> {
    (
        any::<i64>(),
        "\\PC{0,12}",
        proptest::option::of(-1.0e9f64..1.0e9),
        prop::collection::vec(("[a-z]{1,4}", any::<bool>()), 0..4),
    )
        .prop_map(|(id, label, score, tags)| {
            let tags: IndexMap<Key, Value> = tags
                .into_iter()
                .map(|(k, v)| (Key::String(k), Value::Bool(v)))
                .collect();
            Value::Object(
                Object::new("Reading")
                    .with("id", id)
                    .with("label", label)
                    .with("score", score)
                    .with("tags", Value::Dict(tags)),
            )
        })
}

proptest! {
    /// Property: decode(encode(v)) == v for lists of objects
    #[test]
    fn proptest_round_trip_eager(readings in prop::collection::vec(arb_reading(), 0..6)) {
        let stencil = stencil(DecodeStrategy::Eager);
        let ty: Type = "list<Reading>".parse().unwrap();
        let value = Value::List(readings);

        let text = stencil.encode_to_string(&value, &ty).unwrap();
        let decoded = stencil.decode_str(&text, &ty).unwrap();

        prop_assert_eq!(decoded, value);
    }

    /// Property: lazy decoding agrees with eager decoding
    #[test]
    fn proptest_round_trip_lazy(readings in prop::collection::vec(arb_reading(), 0..6)) {
        let eager = stencil(DecodeStrategy::Eager);
        let lazy = stencil(DecodeStrategy::Lazy);
        let ty: Type = "list<Reading>".parse().unwrap();
        let value = Value::List(readings);

        let text = eager.encode_to_string(&value, &ty).unwrap();

        prop_assert_eq!(
            lazy.decode_str(&text, &ty).unwrap(),
            eager.decode_str(&text, &ty).unwrap()
        );
        prop_assert_eq!(lazy.decode_str(&text, &ty).unwrap(), value);
    }
}
