#![allow(non_snake_case)]

use super::*;
use test_case::test_case;

#[test_case("trim", Value::from("  hi  "), Value::from("hi"))]
#[test_case("upper", Value::from("hi"), Value::from("HI"))]
#[test_case("lower", Value::from("HI"), Value::from("hi"))]
#[test_case("to_string", Value::Int(42), Value::from("42"))]
#[test_case("length", Value::list([1, 2, 3]), Value::Int(3))]
#[test_case("null", Value::Int(1), Value::Null)]
#[test_case("identity", Value::Bool(true), Value::Bool(true))]
fn Formatters___builtins___transform_values(name: &str, input: Value, expected: Value) {
    let formatters = Formatters::with_builtins();

    let output = formatters.apply(name, input, &Config::new()).unwrap();

    assert_eq!(output, expected);
}

#[test]
fn Formatters___apply___unknown_name_is_an_error() {
    let formatters = Formatters::new();

    let result = formatters.apply("missing", Value::Null, &Config::new());

    assert!(matches!(result, Err(StencilError::Formatter { name, .. }) if name == "missing"));
}

#[test]
fn Formatters___builtin___rejects_wrong_kind() {
    let formatters = Formatters::with_builtins();

    let result = formatters.apply("upper", Value::Int(1), &Config::new());

    assert!(matches!(result, Err(StencilError::Formatter { .. })));
}

#[test]
fn Formatters___register___receives_config() {
    let mut formatters = Formatters::new();
    formatters.register("prefix", |value, config| {
        let prefix = config.get::<String>("prefix").unwrap_or_default();
        Ok(Value::String(format!(
            "{prefix}{}",
            value.as_str().unwrap_or_default()
        )))
    });
    let mut config = Config::new();
    config.set("prefix", "id-").unwrap();

    let output = formatters
        .apply("prefix", Value::from("7"), &config)
        .unwrap();

    assert_eq!(output, Value::from("id-7"));
}

#[test]
fn Formatters___debug___lists_sorted_names() {
    let mut formatters = Formatters::new();
    formatters.register("b", |v, _| Ok(v));
    formatters.register("a", |v, _| Ok(v));

    assert_eq!(format!("{formatters:?}"), r#"Formatters { names: ["a", "b"] }"#);
}
