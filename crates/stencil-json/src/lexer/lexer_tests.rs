#![allow(non_snake_case)]

use super::*;
use std::io::Cursor;

fn lex(input: &str) -> Vec<(String, u64)> {
    let mut cursor = Cursor::new(input.as_bytes().to_vec());
    tokens(&mut cursor, 0, None)
        .unwrap()
        .map(|t| {
            let t = t.unwrap();
            (t.value, t.offset)
        })
        .collect()
}

fn values(input: &str) -> Vec<String> {
    lex(input).into_iter().map(|(v, _)| v).collect()
}

#[test]
fn Lexer___structural_and_atoms___yield_offsets() {
    let tokens = lex(r#"{"id": 1, "ok": true}"#);

    assert_eq!(
        tokens,
        vec![
            ("{".to_string(), 0),
            ("\"id\"".to_string(), 1),
            (":".to_string(), 5),
            ("1".to_string(), 7),
            (",".to_string(), 8),
            ("\"ok\"".to_string(), 10),
            (":".to_string(), 14),
            ("true".to_string(), 16),
            ("}".to_string(), 20),
        ]
    );
}

#[test]
fn Lexer___string_with_escaped_delimiters___is_one_token() {
    let tokens = values(r#"["a\"],{:", "b\\"]"#);

    assert_eq!(tokens, vec!["[", r#""a\"],{:""#, ",", r#""b\\""#, "]"]);
}

#[test]
fn Lexer___leading_bom___is_skipped() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(b"[1]");
    let mut cursor = Cursor::new(bytes);

    let tokens: Vec<Token> = tokens(&mut cursor, 0, None)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(tokens[0].value, "[");
    assert_eq!(tokens[0].offset, 3);
    assert_eq!(tokens.len(), 3);
}

#[test]
fn Lexer___start_offset_and_length___restrict_range() {
    let input = b"[10, [20, 30], 40]";
    let mut cursor = Cursor::new(input.to_vec());

    let tokens: Vec<Token> = tokens(&mut cursor, 5, Some(8))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    let values: Vec<_> = tokens.iter().map(|t| t.value.as_str()).collect();
    assert_eq!(values, vec!["[", "20", ",", "30", "]"]);
    assert_eq!(tokens[1].offset, 6);
}

#[test]
fn Lexer___long_atom___is_not_truncated() {
    let long = "x".repeat(CHUNK_SIZE * 3 + 17);
    let input = format!("[\"{long}\", 1]");

    let tokens = values(&input);

    assert_eq!(tokens[1].len(), long.len() + 2);
    assert_eq!(tokens[3], "1");
}

#[test]
fn Lexer___numbers_and_literals___are_atoms() {
    let tokens = values("[-1.5e3,null,false, 0]");

    assert_eq!(tokens, vec!["[", "-1.5e3", ",", "null", ",", "false", ",", "0", "]"]);
}

#[test]
fn Lexer___unterminated_string___is_malformed() {
    let mut cursor = Cursor::new(b"[\"abc".to_vec());

    let result: Result<Vec<Token>, _> = tokens(&mut cursor, 0, None).unwrap().collect();

    assert!(matches!(result, Err(StencilError::MalformedInput(_))));
}

#[test]
fn Lexer___unreadable_stream___is_resource_error() {
    struct Broken;
    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk gone"))
        }
    }

    let mut reader = Broken;
    let mut lexer = Lexer::new(&mut reader, 0, None);

    assert!(matches!(lexer.next(), Some(Err(StencilError::Resource(_)))));
    assert!(lexer.next().is_none());
}

#[test]
fn Token___end___is_one_past_last_byte() {
    let token = Token {
        value: "\"ab\"".to_string(),
        offset: 10,
    };

    assert_eq!(token.end(), 14);
    assert!(!token.is_opener());
}
