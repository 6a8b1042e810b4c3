//! Shared command setup: schema, config and the facade

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use stencil::{ClassRegistry, Config, Formatters, Stencil, Type};

/// Options common to every command
#[derive(Debug)]
pub struct Context {
    schema: Option<PathBuf>,
    config: Config,
}

impl Context {
    /// Read the config file, if any, and apply `--cache-dir` over it
    pub fn load(
        schema: Option<&Path>,
        config: Option<&Path>,
        cache_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let mut config = match config {
            Some(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("Failed to read config: {path:?}"))?;
                Config::from_json(&bytes)
                    .with_context(|| format!("Failed to parse config: {path:?}"))?
            }
            None => Config::new(),
        };
        if cache_dir.is_some() {
            config.cache_dir = cache_dir;
        }
        Ok(Self {
            schema: schema.map(Path::to_path_buf),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Directory of the template cache, required by `cache` commands
    pub fn cache_dir(&self) -> Result<&Path> {
        self.config
            .cache_dir
            .as_deref()
            .context("No cache directory: pass --cache-dir or set cache_dir in the config")
    }

    fn registry(&self) -> Result<ClassRegistry> {
        match &self.schema {
            Some(path) => {
                ClassRegistry::from_path(path)
                    .with_context(|| format!("Failed to load schema: {path:?}"))
            }
            None => Ok(ClassRegistry::new()),
        }
    }

    /// Facade over the schema, with per-command config adjustments
    pub fn stencil(&self, adjust: impl FnOnce(&mut Config)) -> Result<Stencil<ClassRegistry>> {
        let mut config = self.config.clone();
        adjust(&mut config);
        Ok(Stencil::new(self.registry()?, Formatters::with_builtins(), config))
    }
}

pub fn parse_type(text: &str) -> Result<Type> {
    text.parse().with_context(|| format!("Invalid type: {text}"))
}
