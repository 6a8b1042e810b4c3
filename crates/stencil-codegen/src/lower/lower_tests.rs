#![allow(non_snake_case)]

use super::*;
use crate::builder::ModelBuilder;
use crate::optimizer::optimize_program;
use crate::render::render;
use stencil_core::{ClassDef, ClassRegistry, FieldDef};
use test_case::test_case;

fn t(s: &str) -> Type {
    s.parse().unwrap()
}

fn registry() -> ClassRegistry {
    ClassRegistry::new()
        .with_class(
            "User",
            ClassDef::new()
                .field(FieldDef::new("id", Type::Int))
                .field(FieldDef::new("name", Type::String).wire_name("userName")),
        )
        .with_class(
            "Node",
            ClassDef::new()
                .field(FieldDef::new("value", Type::Int))
                .field(FieldDef::new("next", t("?Node"))),
        )
        .with_class(
            "Tree",
            ClassDef::new()
                .field(FieldDef::new("label", Type::String).formatters(["trim"], Type::String))
                .field(
                    FieldDef::new("children", t("list<Tree>"))
                        .max_depth(2, Some(("length", Type::Int))),
                ),
        )
        .with_class("Empty", ClassDef::new())
}

fn program(ty: &str, direction: Direction, strategy: Strategy, config: &Config) -> Program {
    let loader = registry();
    let root = ModelBuilder::new(&loader, config, direction).build(&t(ty)).unwrap();
    Lowering::new(&root, direction, strategy, config)
        .lower(&root, Flavor::String)
        .unwrap()
}

fn call(builtin: Builtin, args: Vec<EmissionNode>) -> EmissionNode {
    EmissionNode::builtin(builtin, args)
}

fn field(name: &str) -> EmissionNode {
    EmissionNode::property(EmissionNode::var("value"), name)
}

#[test]
fn Lowering___encode_int_list___loops_with_separator() {
    let program = program("list<int>", Direction::Encode, Strategy::Eager, &Config::new());

    assert_eq!(program.entry.name, "encode");
    assert_eq!(program.entry.params, vec!["value"]);
    assert_eq!(
        program.entry.body,
        vec![
            EmissionNode::write("["),
            EmissionNode::assign(EmissionNode::var("sep1"), EmissionNode::string("")),
            EmissionNode::Foreach {
                iterable: Box::new(EmissionNode::var("value")),
                key: None,
                value: "item1".to_string(),
                body: vec![
                    call(Builtin::Write, vec![EmissionNode::var("sep1")]),
                    call(Builtin::WriteScalar, vec![EmissionNode::var("item1")]),
                    EmissionNode::assign(EmissionNode::var("sep1"), EmissionNode::string(",")),
                ],
            },
            EmissionNode::write("]"),
        ]
    );
    assert!(program.routines.is_empty());
}

#[test]
fn Lowering___encode_object___writes_static_keys_after_optimization() {
    let program = program("User", Direction::Encode, Strategy::Eager, &Config::new());
    let program = optimize_program(program);

    assert_eq!(
        program.entry.body,
        vec![
            call(Builtin::Enter, vec![EmissionNode::string("User")]),
            EmissionNode::write("{\"id\":"),
            call(Builtin::WriteScalar, vec![field("id")]),
            EmissionNode::write(",\"userName\":"),
            call(Builtin::WriteScalar, vec![field("name")]),
            EmissionNode::write("}"),
            call(Builtin::Leave, vec![EmissionNode::string("User")]),
        ]
    );
}

#[test]
fn Lowering___encode_empty_object___writes_braces() {
    let program = program("Empty", Direction::Encode, Strategy::Eager, &Config::new());
    let program = optimize_program(program);

    assert!(program.entry.body.contains(&EmissionNode::write("{}")));
}

#[test]
fn Lowering___self_reference___emits_routine_and_calls_it() {
    let program = program("Node", Direction::Encode, Strategy::Eager, &Config::new());

    assert_eq!(
        program.entry.body,
        vec![EmissionNode::Call {
            callee: Callee::Routine("encode_Node".to_string()),
            args: vec![EmissionNode::var("value")],
        }]
    );
    let routine = program.routine("encode_Node").unwrap();
    assert!(render(&program).contains("encode_Node(value.next)"));
    assert_eq!(routine.params, vec!["value"]);
}

#[test]
fn Lowering___decode_eager___parses_input_then_returns_result() {
    let program = program("User", Direction::Decode, Strategy::Eager, &Config::new());

    let body = &program.entry.body;
    assert_eq!(
        body[0],
        EmissionNode::assign(
            EmissionNode::var("data"),
            call(Builtin::ParseAt, vec![EmissionNode::var("input")])
        )
    );
    assert!(body.contains(&EmissionNode::assign(
        EmissionNode::property(EmissionNode::var("object1"), "name"),
        call(
            Builtin::ReadScalar,
            vec![
                EmissionNode::index(EmissionNode::var("fields1"), EmissionNode::string("userName")),
                EmissionNode::string("string"),
            ]
        ),
    )));
    assert_eq!(
        body.last(),
        Some(&EmissionNode::Return(Some(Box::new(EmissionNode::var("result")))))
    );
}

#[test]
fn Lowering___decode_lazy___splits_and_parses_on_demand() {
    let program = program("list<int>", Direction::Decode, Strategy::Lazy, &Config::new());

    assert_eq!(program.strategy, Strategy::Lazy);
    assert_eq!(
        program.entry.body[1],
        EmissionNode::Foreach {
            iterable: Box::new(call(Builtin::SplitList, vec![EmissionNode::var("input")])),
            key: None,
            value: "item1".to_string(),
            body: vec![EmissionNode::assign(
                EmissionNode::append(EmissionNode::var("list1")),
                call(
                    Builtin::ReadScalar,
                    vec![
                        call(Builtin::ParseAt, vec![EmissionNode::var("item1")]),
                        EmissionNode::string("int"),
                    ]
                ),
            )],
        }
    );
}

#[test]
fn Lowering___encode_forces_eager_strategy() {
    let program = program("list<int>", Direction::Encode, Strategy::Lazy, &Config::new());

    assert_eq!(program.strategy, Strategy::Eager);
}

#[test]
fn Lowering___collect_errors___wraps_elements_in_try() {
    let config = Config::new().with_collect_errors(true);

    let program = program("list<int>", Direction::Decode, Strategy::Eager, &config);

    let EmissionNode::Foreach { key, body, .. } = &program.entry.body[2] else {
        panic!("expected foreach, got {:?}", program.entry.body[2]);
    };
    assert_eq!(key.as_deref(), Some("key1"));
    assert!(matches!(
        body.as_slice(),
        [EmissionNode::Try { site, key: Some(k), .. }] if site == "list<int>" && k == "key1"
    ));
}

#[test_case("int|string", &[&["int"], &["string"]] ; "int and string")]
#[test_case("float|string", &[&["float", "int"], &["string"]] ; "float accepts int")]
#[test_case("int|float", &[&["int"], &["float"]] ; "float with int sibling")]
fn Lowering___decode_union___tests_wire_kinds_in_order(ty: &str, expected: &[&[&str]]) {
    let program = program(ty, Direction::Decode, Strategy::Eager, &Config::new());

    let EmissionNode::If { branches, otherwise } = &program.entry.body[1] else {
        panic!("expected if chain");
    };
    let kinds: Vec<Vec<String>> = branches
        .iter()
        .map(|branch| match &branch.condition {
            EmissionNode::Call { args, .. } => args[1..]
                .iter()
                .map(|arg| match arg {
                    EmissionNode::Literal(Literal::String(s)) => s.clone(),
                    other => panic!("unexpected argument {other:?}"),
                })
                .collect(),
            other => panic!("unexpected condition {other:?}"),
        })
        .collect();
    let expected: Vec<Vec<String>> = expected
        .iter()
        .map(|kinds| kinds.iter().map(|k| k.to_string()).collect())
        .collect();
    assert_eq!(kinds, expected);
    assert!(matches!(
        otherwise.as_deref(),
        Some([EmissionNode::Throw { failure: Failure::UnexpectedValue { .. }, .. }])
    ));
}

#[test]
fn Lowering___decode_union_with_object___tests_required_keys() {
    let program = program("int|User", Direction::Decode, Strategy::Eager, &Config::new());

    let EmissionNode::If { branches, .. } = &program.entry.body[1] else {
        panic!("expected if chain");
    };
    assert_eq!(
        branches[0].condition,
        call(
            Builtin::HasKeys,
            vec![
                EmissionNode::var("data"),
                EmissionNode::Literal(Literal::List(vec![
                    Literal::String("id".to_string()),
                    Literal::String("userName".to_string()),
                ])),
            ]
        )
    );
}

#[test]
fn Lowering___max_depth_field___guards_with_overflow_formatter() {
    let program = program("Tree", Direction::Encode, Strategy::Eager, &Config::new());

    let text = render(&program);

    assert!(text.contains("if depth_exceeded(\"Tree\", 2) {"), "{text}");
    assert!(text.contains("write_scalar(@length(value.children, config));"), "{text}");
    assert!(text.contains("field1 = @trim(value.label, config);"), "{text}");
}

#[test]
fn Lowering___decode_enum___passes_cases_literal() {
    let loader = ClassRegistry::new().with_enum("Suit", ScalarKind::String, ["H", "S"]);
    let config = Config::new();
    let ty = t("enum<Suit, string>");
    let root = ModelBuilder::new(&loader, &config, Direction::Decode).build(&ty).unwrap();

    let program = Lowering::new(&root, Direction::Decode, Strategy::Eager, &config)
        .lower(&root, Flavor::String)
        .unwrap();

    assert_eq!(
        program.entry.body[1],
        EmissionNode::assign(
            EmissionNode::var("result"),
            call(
                Builtin::ReadEnum,
                vec![
                    EmissionNode::var("data"),
                    EmissionNode::string("Suit"),
                    EmissionNode::string("string"),
                    EmissionNode::Literal(Literal::List(vec![
                        Literal::String("H".to_string()),
                        Literal::String("S".to_string()),
                    ])),
                ]
            )
        )
    );
}

#[test_case("Page<User>", "Page_User")]
#[test_case("list<int>", "list_int")]
#[test_case("dict<string, ?User>", "dict_string_User")]
fn identifier___type_string___is_routine_safe(ty: &str, expected: &str) {
    assert_eq!(identifier(ty), expected);
}
