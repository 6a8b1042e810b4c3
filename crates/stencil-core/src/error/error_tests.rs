#![allow(non_snake_case)]

use super::*;
use test_case::test_case;

#[test_case(StencilError::UnsupportedType("resource".into()), 1)]
#[test_case(StencilError::UnsupportedFormat("csv".into()), 2)]
#[test_case(StencilError::AmbiguousUnion { union: "A|B".into(), candidates: vec![] }, 3)]
#[test_case(StencilError::MalformedInput("eof".into()), 5)]
#[test_case(StencilError::unexpected("int", "string"), 6)]
#[test_case(StencilError::MaxDepthExceeded { class: "Node".into(), depth: 2 }, 7)]
#[test_case(StencilError::UnknownClass("Ghost".into()), 9)]
#[test_case(StencilError::Template("bad".into()), 12)]
fn StencilError___error_code___is_stable(err: StencilError, expected: u32) {
    assert_eq!(err.error_code(), expected);
}

#[test]
fn StencilError___from_io_error___becomes_resource() {
    let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated");

    let err: StencilError = io_err.into();

    assert!(matches!(err, StencilError::Resource(_)));
    assert!(err.to_string().contains("truncated"));
}

#[test]
fn StencilError___from_serde_syntax_error___becomes_malformed_input() {
    let json_err = serde_json::from_str::<serde_json::Value>("[1,").unwrap_err();

    let err: StencilError = json_err.into();

    assert!(matches!(err, StencilError::MalformedInput(_)));
}

#[test]
fn StencilError___ambiguous_union___names_candidates() {
    let err = StencilError::AmbiguousUnion {
        union: "Cat|Dog".to_string(),
        candidates: vec!["Cat".to_string(), "Dog".to_string()],
    };

    let msg = err.to_string();

    assert!(msg.contains("Cat|Dog"));
    assert!(msg.contains("selector"));
}

#[test]
fn StencilError___unexpected___displays_both_sides() {
    let err = StencilError::unexpected("int", "string");

    assert_eq!(err.to_string(), "unexpected value: expected int, got string");
}
