//! JSON output for scalars, keys and untyped values

use crate::parse::MAX_NESTING;
use stencil_core::{JsonFlags, Key, StencilError, StencilResult, Value};
use std::io::Write;

/// Write a scalar value (`null`, bool, int, float, string).
///
/// Enum values are written as their backing scalar.
pub fn write_scalar<W: Write + ?Sized>(
    out: &mut W,
    value: &Value,
    flags: JsonFlags,
) -> StencilResult<()> {
    match value {
        Value::Null => out.write_all(b"null")?,
        Value::Bool(true) => out.write_all(b"true")?,
        Value::Bool(false) => out.write_all(b"false")?,
        Value::Int(i) => write!(out, "{i}")?,
        Value::Float(f) => out.write_all(format_float(*f, flags)?.as_bytes())?,
        Value::String(s) => serde_json::to_writer(&mut *out, s)?,
        Value::Enum { value, .. } => write_scalar(out, value, flags)?,
        other => return Err(StencilError::unexpected("a scalar", other.kind())),
    }
    Ok(())
}

fn format_float(f: f64, flags: JsonFlags) -> StencilResult<String> {
    if !f.is_finite() {
        return Err(StencilError::unexpected("a finite float", f.to_string()));
    }
    let text = serde_json::to_string(&f)?;
    if flags.contains(JsonFlags::PRESERVE_ZERO_FRACTION) {
        return Ok(text);
    }
    Ok(match text.strip_suffix(".0") {
        Some(integral) => integral.to_string(),
        None => text,
    })
}

/// Write a dict key; JSON keys are always strings
pub fn write_key<W: Write + ?Sized>(out: &mut W, key: &Key) -> StencilResult<()> {
    match key {
        Key::Int(i) => write!(out, "\"{i}\"")?,
        Key::String(s) => serde_json::to_writer(&mut *out, s)?,
    }
    Ok(())
}

/// Write any value without a declared type.
///
/// Objects are written by source field name in declaration order. Values
/// nested deeper than [`MAX_NESTING`] are rejected.
pub fn write_value<W: Write + ?Sized>(
    out: &mut W,
    value: &Value,
    flags: JsonFlags,
) -> StencilResult<()> {
    write_nested(out, value, flags, 0)
}

fn write_nested<W: Write + ?Sized>(
    out: &mut W,
    value: &Value,
    flags: JsonFlags,
    depth: usize,
) -> StencilResult<()> {
    let container = matches!(value, Value::List(_) | Value::Dict(_) | Value::Object(_));
    if container && depth >= MAX_NESTING {
        return Err(StencilError::unexpected(
            format!("at most {MAX_NESTING} levels of nesting"),
            format!("a deeper {}", value.kind()),
        ));
    }
    match value {
        Value::List(items) => {
            out.write_all(b"[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.write_all(b",")?;
                }
                write_nested(out, item, flags, depth + 1)?;
            }
            out.write_all(b"]")?;
        }
        Value::Dict(map) => {
            out.write_all(b"{")?;
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.write_all(b",")?;
                }
                write_key(out, key)?;
                out.write_all(b":")?;
                write_nested(out, item, flags, depth + 1)?;
            }
            out.write_all(b"}")?;
        }
        Value::Object(object) => {
            out.write_all(b"{")?;
            for (i, (name, item)) in object.fields.iter().enumerate() {
                if i > 0 {
                    out.write_all(b",")?;
                }
                serde_json::to_writer(&mut *out, name)?;
                out.write_all(b":")?;
                write_nested(out, item, flags, depth + 1)?;
            }
            out.write_all(b"}")?;
        }
        scalar => write_scalar(out, scalar, flags)?,
    }
    Ok(())
}
