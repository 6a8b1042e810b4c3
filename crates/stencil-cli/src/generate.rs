//! `stencil generate`

use crate::context::{Context, parse_type};
use anyhow::Result;
use std::io::Write;
use stencil::{Direction, Flavor, Strategy};

pub fn run(
    context: &Context,
    ty: &str,
    direction: Direction,
    flavor: Flavor,
    lazy: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let ty = parse_type(ty)?;
    let stencil = context.stencil(|config| {
        if lazy {
            config.strategy = Strategy::Lazy;
        }
    })?;
    let source = stencil.generate(&ty, direction, flavor)?;
    out.write_all(source.as_bytes())?;
    Ok(())
}
