//! Template cache: on-disk files plus a per-process table

use crate::key::{CacheKey, TEMPLATE_EXTENSION};
use crate::template::Template;
use dashmap::DashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use stencil_core::{Config, MetadataLoader, StencilError, StencilResult};

/// Caches generated templates by [`CacheKey`].
///
/// Templates are kept in memory for the life of the cache and, when a
/// directory is configured, persisted as one file per key. Writers never
/// lock: a template is written to a temporary file in the cache directory
/// and renamed into place, so concurrent writers racing on one key leave
/// either the old or the new file, never a partial one.
#[derive(Debug, Default)]
pub struct TemplateCache {
    dir: Option<PathBuf>,
    templates: DashMap<CacheKey, Arc<Template>>,
    generated: AtomicU64,
}

impl TemplateCache {
    /// Cache persisted under `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Self::default()
        }
    }

    /// Cache that never touches the filesystem
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// File for `key`, if this cache is persisted
    pub fn path(&self, key: &CacheKey) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(key.file_name()))
    }

    /// Number of templates generated by this cache so far
    pub fn generated(&self) -> u64 {
        self.generated.load(Ordering::Relaxed)
    }

    /// Number of templates held in memory
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Return the template for `key`, generating it on a miss.
    ///
    /// With `config.force_regenerate` the template is always rebuilt and
    /// rewritten.
    pub fn ensure(
        &self,
        key: &CacheKey,
        loader: &dyn MetadataLoader,
        config: &Config,
    ) -> StencilResult<Arc<Template>> {
        if !config.force_regenerate {
            if let Some(template) = self.templates.get(key).map(|r| r.clone()) {
                tracing::trace!(ty = %key.ty, direction = %key.direction, "template cache hit");
                return Ok(template);
            }
            if let Some(template) = self.load(key)? {
                let template = Arc::new(template);
                self.templates.insert(key.clone(), template.clone());
                return Ok(template);
            }
        }

        tracing::debug!(
            ty = %key.ty,
            direction = %key.direction,
            flavor = %key.flavor,
            strategy = %key.strategy,
            variation = %key.variation,
            "template cache miss, generating"
        );
        let template = Template::generate(key, loader, config)?;
        self.generated.fetch_add(1, Ordering::Relaxed);

        if let Some(path) = self.path(key) {
            write_atomic(&path, &template.to_bytes()?)?;
            tracing::info!(path = %path.display(), "wrote template");
        }

        let template = Arc::new(template);
        self.templates.insert(key.clone(), template.clone());
        Ok(template)
    }

    /// Like [`ensure`](Self::ensure) but return the template file path
    pub fn ensure_path(
        &self,
        key: &CacheKey,
        loader: &dyn MetadataLoader,
        config: &Config,
    ) -> StencilResult<PathBuf> {
        let path = self
            .path(key)
            .ok_or_else(|| StencilError::Config("template cache has no directory".to_string()))?;
        let exists = path.is_file();
        if !exists || config.force_regenerate {
            // The in-memory table may still hold a template whose file was deleted
            self.templates.remove(key);
        }
        self.ensure(key, loader, config)?;
        Ok(path)
    }

    /// Drop `key` from memory and disk
    pub fn invalidate(&self, key: &CacheKey) -> StencilResult<()> {
        self.templates.remove(key);
        if let Some(path) = self.path(key) {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "removed template"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Drop every template; returns the number of files removed
    pub fn clear(&self) -> StencilResult<usize> {
        self.templates.clear();
        let Some(dir) = &self.dir else {
            return Ok(0);
        };
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == TEMPLATE_EXTENSION) {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        tracing::info!(dir = %dir.display(), removed, "cleared template cache");
        Ok(removed)
    }

    /// Read a persisted template; a stale or unreadable file counts as a miss
    fn load(&self, key: &CacheKey) -> StencilResult<Option<Template>> {
        let Some(path) = self.path(key) else {
            return Ok(None);
        };
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match Template::from_bytes(&bytes) {
            Ok(template) if template.key == *key => {
                tracing::debug!(path = %path.display(), "loaded template");
                Ok(Some(template))
            }
            Ok(_) => {
                tracing::warn!(
                    path = %path.display(),
                    "template file belongs to another key, regenerating"
                );
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "unreadable template file, regenerating"
                );
                Ok(None)
            }
        }
    }
}

/// Write `bytes` to a temporary file next to `path`, then rename it over `path`
fn write_atomic(path: &Path, bytes: &[u8]) -> StencilResult<()> {
    let dir = path.parent().ok_or_else(|| {
        StencilError::Config(format!("{} has no parent directory", path.display()))
    })?;
    std::fs::create_dir_all(dir)?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| StencilError::Resource(e.error))?;
    Ok(())
}

#[cfg(test)]
#[path = "store/store_tests.rs"]
mod store_tests;
