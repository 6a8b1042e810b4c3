//! Encoder/decoder facade over the template cache and runtime

use crate::stream::ListStream;
use std::borrow::Cow;
use std::io::{Cursor, Read, Seek, Write};
use std::path::PathBuf;
use std::sync::Arc;
use stencil_cache::{CacheKey, Template, TemplateCache};
use stencil_core::{
    Config, Direction, Flavor, Formatters, MetadataLoader, StencilError, StencilResult, Type, Value,
};
use stencil_runtime::{Decoded, ElementError, Machine, Resource};

/// Encodes and decodes values of any described [`Type`].
///
/// Templates are generated on first use per type, direction, flavor and
/// strategy, then reused from the [`TemplateCache`] (and from disk across
/// processes when a cache directory is set).
///
/// # Example
///
/// ```
/// use stencil::prelude::*;
///
/// let stencil = Stencil::new(ClassRegistry::new(), Formatters::with_builtins(), Config::new());
/// let ty: Type = "list<int>".parse()?;
///
/// let value = stencil.decode_str("[1, 2, 3]", &ty)?;
/// assert_eq!(stencil.encode_to_string(&value, &ty)?, "[1,2,3]");
/// # Ok::<(), StencilError>(())
/// ```
#[derive(Debug)]
pub struct Stencil<L> {
    loader: L,
    formatters: Formatters,
    config: Config,
    cache: TemplateCache,
}

impl<L: MetadataLoader> Stencil<L> {
    /// Create a facade; templates persist under `config.cache_dir` when set
    pub fn new(loader: L, formatters: Formatters, config: Config) -> Self {
        let cache = match &config.cache_dir {
            Some(dir) => TemplateCache::new(dir),
            None => TemplateCache::in_memory(),
        };
        Self {
            loader,
            formatters,
            config,
            cache,
        }
    }

    /// Persist templates under `dir`
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.cache = TemplateCache::new(&dir);
        self.config.cache_dir = Some(dir);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn formatters(&self) -> &Formatters {
        &self.formatters
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    /// Cache key of one template under this facade's configuration
    pub fn cache_key(&self, ty: &Type, direction: Direction, flavor: Flavor) -> CacheKey {
        CacheKey::new(ty.clone(), direction, flavor, self.config.strategy, &self.config)
    }

    /// Template for `ty`, generated on a cache miss
    pub fn template(
        &self,
        ty: &Type,
        direction: Direction,
        flavor: Flavor,
    ) -> StencilResult<Arc<Template>> {
        self.template_with(ty, direction, flavor, &self.config)
    }

    fn template_with(
        &self,
        ty: &Type,
        direction: Direction,
        flavor: Flavor,
        config: &Config,
    ) -> StencilResult<Arc<Template>> {
        let key = CacheKey::new(ty.clone(), direction, flavor, config.strategy, config);
        self.cache.ensure(&key, &self.loader, config)
    }

    /// Rendered source of the template for `ty`
    pub fn generate(
        &self,
        ty: &Type,
        direction: Direction,
        flavor: Flavor,
    ) -> StencilResult<String> {
        Ok(self.template(ty, direction, flavor)?.source.clone())
    }

    /// Generate the encode and decode templates for `ty` in every flavor
    pub fn warm(&self, ty: &Type) -> StencilResult<Vec<Arc<Template>>> {
        let mut templates = Vec::new();
        for direction in [Direction::Encode, Direction::Decode] {
            for flavor in [Flavor::String, Flavor::Stream, Flavor::Resource] {
                templates.push(self.template(ty, direction, flavor)?);
            }
        }
        Ok(templates)
    }

    /// Config with collect-errors switched on, borrowed when already set
    fn collecting(&self) -> Cow<'_, Config> {
        if self.config.collect_errors {
            Cow::Borrowed(&self.config)
        } else {
            let mut config = self.config.clone();
            config.collect_errors = true;
            Cow::Owned(config)
        }
    }

    fn encode_with(
        &self,
        value: &Value,
        ty: &Type,
        flavor: Flavor,
        config: &Config,
        sink: &mut dyn Write,
    ) -> StencilResult<Vec<ElementError>> {
        tracing::debug!(
            ty = %ty,
            flavor = %flavor,
            collect_errors = config.collect_errors,
            "encoding"
        );
        let template = self.template_with(ty, Direction::Encode, flavor, config)?;
        let errors = Machine::new(&template.program, &self.formatters, config).encode(value, sink)?;
        if !errors.is_empty() {
            tracing::debug!(ty = %ty, skipped = errors.len(), "encoded with collected errors");
        }
        Ok(errors)
    }

    fn decode_with(
        &self,
        resource: &mut dyn Resource,
        ty: &Type,
        flavor: Flavor,
        config: &Config,
    ) -> StencilResult<Decoded> {
        tracing::debug!(
            ty = %ty,
            flavor = %flavor,
            strategy = %config.strategy,
            collect_errors = config.collect_errors,
            "decoding"
        );
        let template = self.template_with(ty, Direction::Decode, flavor, config)?;
        let decoded = Machine::new(&template.program, &self.formatters, config).decode(resource)?;
        if !decoded.errors.is_empty() {
            tracing::debug!(
                ty = %ty,
                skipped = decoded.errors.len(),
                "decoded with collected errors"
            );
        }
        Ok(decoded)
    }

    pub fn encode_to_string(&self, value: &Value, ty: &Type) -> StencilResult<String> {
        let mut buffer = Vec::new();
        self.encode_with(value, ty, Flavor::String, &self.config, &mut buffer)?;
        into_string(buffer)
    }

    /// Encode, skipping list and dict elements that fail
    pub fn encode_to_string_collect(
        &self,
        value: &Value,
        ty: &Type,
    ) -> StencilResult<(String, Vec<ElementError>)> {
        let mut buffer = Vec::new();
        let errors = self.encode_with(value, ty, Flavor::String, &self.collecting(), &mut buffer)?;
        Ok((into_string(buffer)?, errors))
    }

    /// Encode incrementally into `sink`
    pub fn encode_to_stream(
        &self,
        value: &Value,
        ty: &Type,
        sink: &mut dyn Write,
    ) -> StencilResult<()> {
        self.encode_with(value, ty, Flavor::Stream, &self.config, sink)?;
        Ok(())
    }

    /// Encode at the current position of a seekable handle
    pub fn encode_to_resource<W: Write + Seek>(
        &self,
        value: &Value,
        ty: &Type,
        resource: &mut W,
    ) -> StencilResult<()> {
        self.encode_with(value, ty, Flavor::Resource, &self.config, resource)?;
        Ok(())
    }

    pub fn decode_str(&self, input: &str, ty: &Type) -> StencilResult<Value> {
        Ok(self.decode_str_collect_with(input, ty, &self.config)?.value)
    }

    pub fn decode_str_collect(&self, input: &str, ty: &Type) -> StencilResult<Decoded> {
        self.decode_str_collect_with(input, ty, &self.collecting())
    }

    fn decode_str_collect_with(
        &self,
        input: &str,
        ty: &Type,
        config: &Config,
    ) -> StencilResult<Decoded> {
        let mut resource = Cursor::new(input.as_bytes());
        self.decode_with(&mut resource, ty, Flavor::String, config)
    }

    /// Decode everything `reader` yields.
    ///
    /// The input is buffered first, so lazy decoding works on unseekable
    /// streams too.
    pub fn decode_stream(&self, reader: &mut dyn Read, ty: &Type) -> StencilResult<Value> {
        Ok(self.decode_stream_with(reader, ty, &self.config)?.value)
    }

    pub fn decode_stream_collect(
        &self,
        reader: &mut dyn Read,
        ty: &Type,
    ) -> StencilResult<Decoded> {
        self.decode_stream_with(reader, ty, &self.collecting())
    }

    fn decode_stream_with(
        &self,
        reader: &mut dyn Read,
        ty: &Type,
        config: &Config,
    ) -> StencilResult<Decoded> {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        self.decode_with(&mut Cursor::new(buffer), ty, Flavor::Stream, config)
    }

    /// Decode a whole seekable handle
    pub fn decode_resource<R: Read + Seek>(
        &self,
        resource: &mut R,
        ty: &Type,
    ) -> StencilResult<Value> {
        Ok(self.decode_with(resource, ty, Flavor::Resource, &self.config)?.value)
    }

    pub fn decode_resource_collect<R: Read + Seek>(
        &self,
        resource: &mut R,
        ty: &Type,
    ) -> StencilResult<Decoded> {
        self.decode_with(resource, ty, Flavor::Resource, &self.collecting())
    }

    /// Decode the elements of the top-level list in `resource` one at a time.
    ///
    /// Only the boundary of the next element is scanned per step; an
    /// element is parsed when the iterator reaches it.
    pub fn stream_list<'s, 'r, R: Read + Seek>(
        &'s self,
        resource: &'r mut R,
        item_type: &Type,
    ) -> StencilResult<ListStream<'s, 'r, R>> {
        let template = self.template(item_type, Direction::Decode, Flavor::Resource)?;
        tracing::debug!(ty = %item_type, strategy = %self.config.strategy, "streaming list");
        ListStream::open(resource, template, &self.formatters, &self.config)
    }
}

fn into_string(buffer: Vec<u8>) -> StencilResult<String> {
    String::from_utf8(buffer)
        .map_err(|e| StencilError::Template(format!("encoder wrote invalid UTF-8: {e}")))
}
