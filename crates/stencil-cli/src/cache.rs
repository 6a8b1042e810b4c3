//! `stencil cache`

use crate::context::{Context, parse_type};
use anyhow::{Context as _, Result};
use std::io::Write;
use stencil::{Direction, Flavor, TemplateCache};

/// Print where the template for `ty` lives, generating it if missing
pub fn path(
    context: &Context,
    ty: &str,
    direction: Direction,
    flavor: Flavor,
    out: &mut dyn Write,
) -> Result<()> {
    let ty = parse_type(ty)?;
    context.cache_dir()?;
    let stencil = context.stencil(|_| {})?;
    let key = stencil.cache_key(&ty, direction, flavor);
    let path = stencil.cache().ensure_path(&key, stencil.loader(), stencil.config())?;
    writeln!(out, "{}", path.display())?;
    Ok(())
}

pub fn clear(context: &Context, out: &mut dyn Write) -> Result<()> {
    let dir = context.cache_dir()?;
    let removed = TemplateCache::new(dir)
        .clear()
        .with_context(|| format!("Failed to clear cache: {dir:?}"))?;
    writeln!(out, "removed {removed} template(s) from {}", dir.display())?;
    Ok(())
}

pub fn warm(context: &Context, types: &[String], out: &mut dyn Write) -> Result<()> {
    context.cache_dir()?;
    let stencil = context.stencil(|_| {})?;
    for text in types {
        let ty = parse_type(text)?;
        let templates = stencil
            .warm(&ty)
            .with_context(|| format!("Failed to generate templates for {ty}"))?;
        for template in templates {
            if let Some(path) = stencil.cache().path(&template.key) {
                writeln!(out, "{}", path.display())?;
            }
        }
    }
    Ok(())
}
