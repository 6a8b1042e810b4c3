//! End-to-end scenarios through the public facade

#![allow(non_snake_case)]

use std::io::Cursor;
use stencil::prelude::*;
use stencil::{Boundary, Key, ScalarKind};
use tempfile::TempDir;
use test_case::test_case;

const SCHEMA: &str = r#"
[classes.User]
fields = [
    { name = "id", type = "int" },
    { name = "name", type = "string" },
]

[classes.Account]
fields = [
    { name = "owner", type = "User" },
    { name = "email", type = "string", groups = ["private"] },
    { name = "tags", type = "list<string>", groups = ["public"] },
]

[classes.Category]
fields = [
    { name = "title", type = "string", formatters = ["trim"], formatted_type = "string" },
    { name = "children", type = "list<Category>", max_depth = 1, overflow = "length", overflow_type = "int" },
]

[classes.Shape]
fields = [{ name = "name", type = "string" }]

[classes.Circle]
parent = "Shape"
fields = [{ name = "radius", type = "float" }]

[enums.Suit]
backing = "string"
cases = ["hearts", "spades"]
"#;

fn t(s: &str) -> Type {
    s.parse().unwrap()
}

fn stencil(config: Config) -> Stencil<ClassRegistry> {
    Stencil::new(
        ClassRegistry::from_toml_str(SCHEMA).unwrap(),
        Formatters::with_builtins(),
        config,
    )
}

fn user(id: i64, name: &str) -> Value {
    Value::Object(Object::new("User").with("id", id).with("name", name))
}

#[test_case(Strategy::Eager ; "eager")]
#[test_case(Strategy::Lazy ; "lazy")]
fn scenario___int_list___decodes_and_encodes(strategy: Strategy) {
    let stencil = stencil(Config::new().with_strategy(strategy));
    let ty = t("list<int>");

    let value = stencil.decode_str("[1,2,3]", &ty).unwrap();

    assert_eq!(value, Value::list([1, 2, 3]));
    assert_eq!(stencil.encode_to_string(&value, &ty).unwrap(), "[1,2,3]");
}

#[test_case(Strategy::Eager ; "eager")]
#[test_case(Strategy::Lazy ; "lazy")]
fn scenario___object___fields_in_declaration_order_and_same_bytes(strategy: Strategy) {
    let stencil = stencil(Config::new().with_strategy(strategy));
    let input = r#"{"id":1,"name":"dummy"}"#;

    let value = stencil.decode_str(input, &t("User")).unwrap();

    let names: Vec<&str> = value.as_object().unwrap().fields.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["id", "name"]);
    assert_eq!(stencil.encode_to_string(&value, &t("User")).unwrap(), input);
}

#[test]
fn scenario___dict_split___boundary_spans_value() {
    let mut resource = Cursor::new(br#"{"k":10}"#.to_vec());

    let split = stencil::stencil_json::split_dict(&mut resource, 0, None, ScalarKind::String);

    let entries: Vec<(Key, Boundary)> = split
        .unwrap()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(entries.len(), 1);
    let (key, boundary) = &entries[0];
    assert_eq!(*key, Key::from("k"));
    assert_eq!(&br#"{"k":10}"#[boundary.offset as usize..boundary.end() as usize], b"10");
}

#[test]
fn scenario___stream_list___decodes_one_element_per_step() {
    let stencil = stencil(Config::new().with_strategy(Strategy::Lazy));
    let mut resource = Cursor::new(br#"[{"id":1,"name":"a"}, {"id":2,"name":"b"}]"#.to_vec());

    let mut stream = stencil.stream_list(&mut resource, &t("User")).unwrap();

    assert_eq!(stream.next().unwrap().unwrap(), user(1, "a"));
    assert_eq!(stream.next().unwrap().unwrap(), user(2, "b"));
    assert!(stream.next().is_none());
}

#[test]
fn scenario___stream_list_of_null___is_empty() {
    let stencil = stencil(Config::new());
    let mut resource = Cursor::new(b"null".to_vec());

    let items: Vec<_> = stencil.stream_list(&mut resource, &t("int")).unwrap().collect();

    assert!(items.is_empty());
}

#[test]
fn scenario___stream_list_bad_element___stops_after_error() {
    let stencil = stencil(Config::new());
    let mut resource = Cursor::new(br#"[1, "two", 3]"#.to_vec());

    let items: Vec<_> = stencil.stream_list(&mut resource, &t("int")).unwrap().collect();

    assert_eq!(items.len(), 2);
    assert_eq!(*items[0].as_ref().unwrap(), Value::Int(1));
    assert!(items[1].is_err());
}

#[test]
fn scenario___group_filter___encodes_only_selected_fields() {
    let stencil = stencil(Config::new().with_groups(["public"]));
    let account = Value::Object(
        Object::new("Account")
            .with("owner", user(1, "a"))
            .with("email", "a@example.com")
            .with("tags", Value::list(["x"])),
    );

    let text = stencil.encode_to_string(&account, &t("Account")).unwrap();

    assert_eq!(text, r#"{"tags":["x"]}"#);
}

#[test]
fn scenario___overflow_formatter___replaces_deep_branch() {
    let stencil = stencil(Config::new());
    let leaf = Value::Object(
        Object::new("Category")
            .with("title", "c")
            .with("children", Value::List(vec![])),
    );
    let middle = Value::Object(
        Object::new("Category")
            .with("title", "b")
            .with("children", Value::list([leaf.clone(), leaf])),
    );
    let root = Value::Object(
        Object::new("Category")
            .with("title", "  a  ")
            .with("children", Value::list([middle])),
    );

    let text = stencil.encode_to_string(&root, &t("Category")).unwrap();

    assert_eq!(text, r#"{"title":"a","children":[{"title":"b","children":2}]}"#);
}

#[test]
fn scenario___subclass_union___decodes_most_derived_first() {
    let stencil = stencil(Config::new());

    let circle = stencil.decode_str(r#"{"name":"c","radius":1.5}"#, &t("Shape|Circle")).unwrap();
    let shape = stencil.decode_str(r#"{"name":"s"}"#, &t("Shape|Circle")).unwrap();

    assert_eq!(circle.as_object().unwrap().class, "Circle");
    assert_eq!(shape.as_object().unwrap().class, "Shape");
}

#[test]
fn scenario___unrelated_objects_in_union___need_selector() {
    let stencil = stencil(Config::new());

    let result = stencil.decode_str(r#"{"id":1,"name":"a"}"#, &t("User|Shape"));

    assert!(matches!(result, Err(StencilError::AmbiguousUnion { .. })));

    let selected = Stencil::new(
        ClassRegistry::from_toml_str(SCHEMA).unwrap(),
        Formatters::with_builtins(),
        Config::new().with_union_selector("User|Shape", "User"),
    );
    assert_eq!(
        selected.decode_str(r#"{"id":1,"name":"a"}"#, &t("User|Shape")).unwrap(),
        user(1, "a")
    );
}

#[test]
fn scenario___enum_case___round_trips() {
    let stencil = stencil(Config::new());
    let ty = t("list<enum<Suit, string>>");

    let value = stencil.decode_str(r#"["hearts","spades"]"#, &ty).unwrap();

    assert_eq!(stencil.encode_to_string(&value, &ty).unwrap(), r#"["hearts","spades"]"#);
    assert!(stencil.decode_str(r#"["clubs"]"#, &ty).is_err());
}

#[test]
fn scenario___byte_order_mark___is_skipped() {
    let stencil = stencil(Config::new().with_strategy(Strategy::Lazy));

    let value = stencil.decode_str("\u{feff}[1]", &t("list<int>")).unwrap();

    assert_eq!(value, Value::list([1]));
}

#[test]
fn scenario___long_string_token___is_not_truncated() {
    let stencil = stencil(Config::new().with_strategy(Strategy::Lazy));
    let long = "x".repeat(100_000);

    let value = stencil.decode_str(&format!("[\"{long}\"]"), &t("list<string>")).unwrap();

    assert_eq!(value, Value::list([long.as_str()]));
}

#[test]
fn scenario___cache_ensure___is_idempotent_on_disk() {
    let dir = TempDir::new().unwrap();
    let stencil = stencil(Config::new()).with_cache_dir(dir.path());
    let key = stencil.cache_key(&t("list<User>"), Direction::Decode, Flavor::String);

    let path = stencil.cache().ensure_path(&key, stencil.loader(), stencil.config()).unwrap();
    let first = std::fs::read(&path).unwrap();
    stencil.cache().ensure_path(&key, stencil.loader(), stencil.config()).unwrap();
    let second = std::fs::read(&path).unwrap();

    assert_eq!(first, second);
    assert_eq!(stencil.cache().generated(), 1);
}
