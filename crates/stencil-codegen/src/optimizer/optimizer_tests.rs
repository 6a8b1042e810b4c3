#![allow(non_snake_case)]

use super::*;
use crate::ast::Builtin;

fn write_scalar(name: &str) -> EmissionNode {
    EmissionNode::builtin(Builtin::WriteScalar, vec![EmissionNode::var(name)])
}

#[test]
fn optimize___adjacent_literal_writes___collapse_into_one() {
    let nodes = vec![
        EmissionNode::write("{"),
        EmissionNode::write("\"id\":"),
        EmissionNode::write("1"),
    ];

    let optimized = optimize(nodes);

    assert_eq!(optimized, vec![EmissionNode::write("{\"id\":1")]);
}

#[test]
fn optimize___lone_write_next_to_non_literal___is_unchanged() {
    let nodes = vec![EmissionNode::write("["), write_scalar("value")];

    let optimized = optimize(nodes.clone());

    assert_eq!(optimized, nodes);
}

#[test]
fn optimize___non_literal_write___is_a_barrier() {
    let nodes = vec![
        EmissionNode::write("a"),
        EmissionNode::write("b"),
        write_scalar("x"),
        EmissionNode::write("c"),
        EmissionNode::write("d"),
    ];

    let optimized = optimize(nodes);

    assert_eq!(
        optimized,
        vec![EmissionNode::write("ab"), write_scalar("x"), EmissionNode::write("cd")]
    );
}

#[test]
fn optimize___write_of_variable___is_not_merged() {
    let dynamic = EmissionNode::builtin(Builtin::Write, vec![EmissionNode::var("sep1")]);
    let nodes = vec![EmissionNode::write("a"), dynamic.clone(), EmissionNode::write("b")];

    let optimized = optimize(nodes.clone());

    assert_eq!(optimized, nodes);
}

#[test]
fn optimize___nested_sequences___are_spliced_and_merged() {
    let nodes = vec![
        EmissionNode::write("{"),
        EmissionNode::Sequence(vec![
            EmissionNode::write("\"a\":"),
            EmissionNode::Sequence(vec![EmissionNode::write("null")]),
        ]),
        EmissionNode::write("}"),
    ];

    let optimized = optimize(nodes);

    assert_eq!(optimized, vec![EmissionNode::write("{\"a\":null}")]);
}

#[test]
fn optimize___bodies_of_control_flow___are_rewritten() {
    let nodes = vec![
        EmissionNode::If {
            branches: vec![Branch {
                condition: EmissionNode::builtin(Builtin::IsNull, vec![EmissionNode::var("v")]),
                body: vec![EmissionNode::write("nu"), EmissionNode::write("ll")],
            }],
            otherwise: Some(vec![EmissionNode::write("["), EmissionNode::write("]")]),
        },
        EmissionNode::Foreach {
            iterable: Box::new(EmissionNode::var("v")),
            key: None,
            value: "item1".to_string(),
            body: vec![EmissionNode::write(","), EmissionNode::write("0")],
        },
        EmissionNode::Try {
            site: "list<int>".to_string(),
            key: Some("key1".to_string()),
            body: vec![EmissionNode::write("1"), EmissionNode::write("2")],
        },
    ];

    let optimized = optimize(nodes);

    let EmissionNode::If { branches, otherwise } = &optimized[0] else {
        panic!("expected if");
    };
    assert_eq!(branches[0].body, vec![EmissionNode::write("null")]);
    assert_eq!(otherwise.as_deref(), Some(&[EmissionNode::write("[]")][..]));
    let EmissionNode::Foreach { body, .. } = &optimized[1] else {
        panic!("expected foreach");
    };
    assert_eq!(body, &vec![EmissionNode::write(",0")]);
    let EmissionNode::Try { body, .. } = &optimized[2] else {
        panic!("expected try");
    };
    assert_eq!(body, &vec![EmissionNode::write("12")]);
}

#[test]
fn optimize___writes_do_not_merge_across_a_loop() {
    let nodes = vec![
        EmissionNode::write("["),
        EmissionNode::Foreach {
            iterable: Box::new(EmissionNode::var("v")),
            key: None,
            value: "item1".to_string(),
            body: vec![write_scalar("item1")],
        },
        EmissionNode::write("]"),
    ];

    let optimized = optimize(nodes);

    assert_eq!(optimized.len(), 3);
    assert_eq!(optimized[0], EmissionNode::write("["));
    assert_eq!(optimized[2], EmissionNode::write("]"));
}

#[test]
fn optimize_program___reduces_write_count() {
    let program = Program {
        ty: stencil_core::Type::Int,
        direction: stencil_core::Direction::Encode,
        flavor: stencil_core::Flavor::String,
        strategy: stencil_core::Strategy::Eager,
        entry: Routine {
            name: "encode".to_string(),
            params: vec!["value".to_string()],
            body: vec![EmissionNode::write("a"), EmissionNode::write("b"), write_scalar("value")],
        },
        routines: vec![Routine {
            name: "encode_Node".to_string(),
            params: vec!["value".to_string()],
            body: vec![EmissionNode::write("c"), EmissionNode::write("d")],
        }],
    };

    let optimized = optimize_program(program);

    assert_eq!(optimized.write_count(), 3);
    assert_eq!(optimized.routines[0].body, vec![EmissionNode::write("cd")]);
}
