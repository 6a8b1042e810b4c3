//! `stencil split`

use anyhow::{Context as _, Result};
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;
use stencil::stencil_json::{read_range, split_dict, split_list};
use stencil::{Boundary, ScalarKind};

pub fn run(
    input: &Path,
    dict: bool,
    offset: u64,
    length: Option<u64>,
    out: &mut dyn Write,
) -> Result<()> {
    let file = File::open(input).with_context(|| format!("Failed to open input: {input:?}"))?;
    let mut resource = BufReader::new(file);
    print_boundaries(&mut resource, dict, offset, length, out)
}

/// One line per element: `offset length text`, prefixed by the key for dicts
pub fn print_boundaries<R: Read + Seek>(
    resource: &mut R,
    dict: bool,
    offset: u64,
    length: Option<u64>,
    out: &mut dyn Write,
) -> Result<()> {
    let entries: Option<Vec<(Option<String>, Boundary)>> = if dict {
        split_dict(resource, offset, length, ScalarKind::String)?
            .map(|split| {
                split
                    .map(|entry| entry.map(|(key, boundary)| (Some(key.to_string()), boundary)))
                    .collect::<Result<_, _>>()
            })
            .transpose()?
    } else {
        split_list(resource, offset, length)?
            .map(|split| {
                split
                    .map(|boundary| boundary.map(|boundary| (None, boundary)))
                    .collect::<Result<_, _>>()
            })
            .transpose()?
    };
    let Some(entries) = entries else {
        writeln!(out, "null")?;
        return Ok(());
    };

    for (key, boundary) in entries {
        let bytes = read_range(resource, boundary)?;
        if let Some(key) = key {
            write!(out, "{key}\t")?;
        }
        writeln!(
            out,
            "{}\t{}\t{}",
            boundary.offset,
            boundary.length,
            String::from_utf8_lossy(&bytes)
        )?;
    }
    Ok(())
}
