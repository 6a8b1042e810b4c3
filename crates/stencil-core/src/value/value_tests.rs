#![allow(non_snake_case)]

use super::*;
use crate::types::ScalarKind;
use test_case::test_case;

#[test_case(Value::Int(1), Type::Int, true)]
#[test_case(Value::Int(1), Type::Float, false)]
#[test_case(Value::Null, Type::Nullable(Box::new(Type::Int)), true)]
#[test_case(Value::String("x".into()), Type::Nullable(Box::new(Type::String)), true)]
#[test_case(Value::list([1, 2]), Type::list(Type::String), true; "list matches any item type")]
#[test_case(Value::Bool(true), Type::Mixed, true)]
#[test_case(Value::Float(1.5), Type::Union(vec![Type::Int, Type::Float]), true)]
fn Value___is_instance_of___checks_outer_shape(value: Value, ty: Type, expected: bool) {
    assert_eq!(value.is_instance_of(&ty), expected);
}

#[test]
fn Value___is_instance_of___objects_match_exact_class() {
    let value = Value::Object(Object::new("Dog"));

    assert!(value.is_instance_of(&Type::object("Dog")));
    assert!(!value.is_instance_of(&Type::object("Animal")));
}

#[test]
fn Value___is_instance_of___enums_match_class() {
    let value = Value::Enum {
        class: "Suit".to_string(),
        value: Box::new(Value::from("H")),
    };

    assert!(value.is_instance_of(&Type::enumeration("Suit", ScalarKind::String)));
    assert!(!value.is_instance_of(&Type::String));
}

#[test]
fn Value___from_json___converts_nested_tree() {
    let json = serde_json::json!({"a": [1, 2.5, null], "b": {"c": true}});

    let value = Value::from_json(json);

    let Value::Dict(map) = value else {
        panic!("expected dict");
    };
    assert_eq!(
        map.get(&Key::from("a")),
        Some(&Value::List(vec![Value::Int(1), Value::Float(2.5), Value::Null]))
    );
    assert!(matches!(map.get(&Key::from("b")), Some(Value::Dict(_))));
}

#[test]
fn Value___to_json___uses_source_names_and_enum_backing() {
    let value = Value::Object(
        Object::new("Card")
            .with("rank", 10)
            .with(
                "suit",
                Value::Enum {
                    class: "Suit".to_string(),
                    value: Box::new(Value::from("H")),
                },
            ),
    );

    assert_eq!(value.to_json(), serde_json::json!({"rank": 10, "suit": "H"}));
}

#[test]
fn Object___with___preserves_insertion_order() {
    let object = Object::new("User").with("id", 1).with("name", "dummy");

    let names: Vec<_> = object.fields.keys().cloned().collect();

    assert_eq!(names, vec!["id", "name"]);
}

#[test]
fn Value___from_option___maps_none_to_null() {
    assert_eq!(Value::from(None::<i64>), Value::Null);
    assert_eq!(Value::from(Some(3)), Value::Int(3));
}
