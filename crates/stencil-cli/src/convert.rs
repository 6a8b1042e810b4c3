//! `stencil decode` and `stencil encode`

use crate::context::{Context, parse_type};
use anyhow::{Context as _, Result};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use stencil::Strategy;

fn open(input: &Path) -> Result<BufReader<File>> {
    let file = File::open(input).with_context(|| format!("Failed to open input: {input:?}"))?;
    Ok(BufReader::new(file))
}

/// Decode `input` and print the value as pretty JSON.
///
/// Element errors from collect mode go to the log and are counted on the
/// last line.
pub fn decode(
    context: &Context,
    ty: &str,
    input: &Path,
    lazy: bool,
    collect_errors: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let ty = parse_type(ty)?;
    let stencil = context.stencil(|config| {
        if lazy {
            config.strategy = Strategy::Lazy;
        }
    })?;
    let mut resource = open(input)?;

    let decoded = if collect_errors {
        stencil.decode_resource_collect(&mut resource, &ty)?
    } else {
        stencil::Decoded {
            value: stencil.decode_resource(&mut resource, &ty)?,
            errors: Vec::new(),
        }
    };

    serde_json::to_writer_pretty(&mut *out, &decoded.value.to_json())?;
    writeln!(out)?;
    for error in &decoded.errors {
        tracing::warn!("{error}");
    }
    if collect_errors {
        writeln!(out, "{} element error(s)", decoded.errors.len())?;
    }
    Ok(())
}

/// Decode `input` eagerly, then write it back through the encoder template
pub fn encode(context: &Context, ty: &str, input: &Path, out: &mut dyn Write) -> Result<()> {
    let ty = parse_type(ty)?;
    let stencil = context.stencil(|config| config.strategy = Strategy::Eager)?;

    let value = stencil.decode_resource(&mut open(input)?, &ty)?;
    stencil.encode_to_stream(&value, &ty, out)?;
    writeln!(out)?;
    Ok(())
}
