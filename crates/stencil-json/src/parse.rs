//! Token-driven parsing into [`Value`] trees

use crate::lexer::{Lexer, Token, tokens};
use crate::splitter::Boundary;
use indexmap::IndexMap;
use stencil_core::{JsonFlags, Key, ScalarKind, StencilError, StencilResult, Value};
use std::io::{Read, Seek};

/// Deepest list/dict nesting the eager parser accepts
pub const MAX_NESTING: usize = 512;

/// Parse a complete JSON document from `reader`.
///
/// Objects become string-keyed dicts; the decode template gives them their
/// final shape.
pub fn parse_value<R: Read + ?Sized>(reader: &mut R, flags: JsonFlags) -> StencilResult<Value> {
    let mut lexer = Lexer::new(reader, 0, None);
    parse_document(&mut lexer, flags)
}

/// Parse the JSON value spanned by `boundary`
pub fn parse_at<R: Read + Seek + ?Sized>(
    resource: &mut R,
    boundary: Boundary,
    flags: JsonFlags,
) -> StencilResult<Value> {
    let mut lexer = tokens(resource, boundary.offset, Some(boundary.length))?;
    parse_document(&mut lexer, flags)
}

fn parse_document<R: Read + ?Sized>(
    lexer: &mut Lexer<'_, R>,
    flags: JsonFlags,
) -> StencilResult<Value> {
    let first = expect_token(lexer)?;
    let value = parse_from(lexer, first, flags, 0)?;
    if let Some(extra) = lexer.next().transpose()? {
        return Err(StencilError::MalformedInput(format!(
            "trailing {:?} at byte {}",
            extra.value, extra.offset
        )));
    }
    Ok(value)
}

fn expect_token<R: Read + ?Sized>(lexer: &mut Lexer<'_, R>) -> StencilResult<Token> {
    let token = lexer.next().transpose()?;
    let position = Lexer::position(lexer);
    token.ok_or_else(|| {
        StencilError::MalformedInput(format!("unexpected end of input at byte {position}"))
    })
}

fn parse_from<R: Read + ?Sized>(
    lexer: &mut Lexer<'_, R>,
    token: Token,
    flags: JsonFlags,
    depth: usize,
) -> StencilResult<Value> {
    if (token.is('[') || token.is('{')) && depth >= MAX_NESTING {
        return Err(StencilError::MalformedInput(format!(
            "nesting deeper than {MAX_NESTING} at byte {}",
            token.offset
        )));
    }

    if token.is('[') {
        let mut items = Vec::new();
        let mut next = expect_token(lexer)?;
        if next.is(']') {
            return Ok(Value::List(items));
        }
        loop {
            items.push(parse_from(lexer, next, flags, depth + 1)?);
            let separator = expect_token(lexer)?;
            if separator.is(']') {
                return Ok(Value::List(items));
            }
            if !separator.is(',') {
                return Err(malformed(&separator, "',' or ']'"));
            }
            next = expect_token(lexer)?;
        }
    }

    if token.is('{') {
        let mut map = IndexMap::new();
        let mut next = expect_token(lexer)?;
        if next.is('}') {
            return Ok(Value::Dict(map));
        }
        loop {
            if !next.value.starts_with('"') {
                return Err(malformed(&next, "a string key"));
            }
            let key = parse_key(&next.value, ScalarKind::String)?;
            let colon = expect_token(lexer)?;
            if !colon.is(':') {
                return Err(malformed(&colon, "':'"));
            }
            let value_token = expect_token(lexer)?;
            map.insert(key, parse_from(lexer, value_token, flags, depth + 1)?);
            let separator = expect_token(lexer)?;
            if separator.is('}') {
                return Ok(Value::Dict(map));
            }
            if !separator.is(',') {
                return Err(malformed(&separator, "',' or '}'"));
            }
            next = expect_token(lexer)?;
        }
    }

    if token.value.len() == 1 && ":,]}".contains(token.value.as_str()) {
        return Err(malformed(&token, "a value"));
    }

    scalar_from_token(&token.value, flags)
}

fn malformed(token: &Token, expected: &str) -> StencilError {
    StencilError::MalformedInput(format!(
        "expected {expected} at byte {}, found {:?}",
        token.offset, token.value
    ))
}

/// Interpret one atomic token.
///
/// Integers that do not fit `i64` become floats, or strings when
/// [`JsonFlags::BIGINT_AS_STRING`] is set.
pub fn scalar_from_token(token: &str, flags: JsonFlags) -> StencilResult<Value> {
    match token {
        "null" => return Ok(Value::Null),
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        _ => {}
    }

    if token.starts_with('"') {
        let s: String = serde_json::from_str(token)?;
        return Ok(Value::String(s));
    }

    if !is_json_number(token) {
        return Err(StencilError::MalformedInput(format!(
            "invalid literal {token:?}"
        )));
    }

    let integral = !token.contains(['.', 'e', 'E']);
    if integral {
        if let Ok(i) = token.parse::<i64>() {
            return Ok(Value::Int(i));
        }
        if flags.contains(JsonFlags::BIGINT_AS_STRING) {
            return Ok(Value::String(token.to_string()));
        }
    }

    token
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| StencilError::MalformedInput(format!("invalid number {token:?}")))
}

/// Decode a dict key token as `kind`
pub fn parse_key(token: &str, kind: ScalarKind) -> StencilResult<Key> {
    let text: String = serde_json::from_str(token)?;
    match kind {
        ScalarKind::Int => text
            .parse::<i64>()
            .map(Key::Int)
            .map_err(|_| StencilError::unexpected("int key", format!("{text:?}"))),
        _ => Ok(Key::String(text)),
    }
}

/// JSON number grammar: `-? (0 | [1-9][0-9]*) (. [0-9]+)? ([eE] [+-]? [0-9]+)?`
fn is_json_number(token: &str) -> bool {
    let bytes = token.as_bytes();
    let mut i = 0;
    if bytes.get(i) == Some(&b'-') {
        i += 1;
    }
    match bytes.get(i) {
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => {
            while bytes.get(i).is_some_and(u8::is_ascii_digit) {
                i += 1;
            }
        }
        _ => return false,
    }
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        let digits = i;
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        if i == digits {
            return false;
        }
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let digits = i;
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        if i == digits {
            return false;
        }
    }
    i == bytes.len()
}
