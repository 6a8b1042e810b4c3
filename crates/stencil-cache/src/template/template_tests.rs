#![allow(non_snake_case)]

use super::*;
use stencil_core::{ClassDef, ClassRegistry, Direction, FieldDef, Flavor, Strategy, Type};

fn registry() -> ClassRegistry {
    ClassRegistry::new()
        .with_class(
            "User",
            ClassDef::new()
                .field(FieldDef::new("id", Type::Int))
                .field(FieldDef::new("name", Type::String)),
        )
        .with_class(
            "Node",
            ClassDef::new()
                .field(FieldDef::new("value", Type::Int))
                .field(FieldDef::new("next", "?Node".parse().unwrap())),
        )
}

fn key(ty: &str, direction: Direction) -> CacheKey {
    CacheKey::new(ty.parse().unwrap(), direction, Flavor::String, Strategy::Eager, &Config::new())
}

#[test]
fn Template___generate___renders_source_for_program() {
    let key = key("list<Node>", Direction::Encode);

    let template = Template::generate(&key, &registry(), &Config::new()).unwrap();

    assert_eq!(template.program.direction, Direction::Encode);
    assert!(template.source.starts_with("// stencil template: encode list<Node>"));
    assert!(template.source.contains("fn encode(value) {"));
    assert!(template.source.contains("fn encode_Node(value) {"));
}

#[test]
fn Template___to_bytes___parses_back_to_equal_template() {
    let key = key("User", Direction::Decode);

    let template = Template::generate(&key, &registry(), &Config::new()).unwrap();

    let bytes = template.to_bytes().unwrap();

    assert_eq!(Template::from_bytes(&bytes).unwrap(), template);
    assert_eq!(bytes.last(), Some(&b'\n'));
}

#[test]
fn Template___generate_twice___identical_bytes() {
    let key = key("dict<string, User>", Direction::Decode);

    let first = Template::generate(&key, &registry(), &Config::new())
        .unwrap()
        .to_bytes()
        .unwrap();
    let second = Template::generate(&key, &registry(), &Config::new())
        .unwrap()
        .to_bytes()
        .unwrap();

    assert_eq!(first, second);
}

#[test]
fn Template___unknown_format___is_unsupported() {
    let mut key = key("User", Direction::Encode);
    key.format = "yaml".to_string();

    let result = Template::generate(&key, &registry(), &Config::new());

    assert!(matches!(result, Err(StencilError::UnsupportedFormat(f)) if f == "yaml"));
}

#[test]
fn Template___unknown_class___propagates_error() {
    let key = key("Missing", Direction::Encode);

    let result = Template::generate(&key, &registry(), &Config::new());

    assert!(matches!(result, Err(StencilError::UnknownClass(_))));
}
