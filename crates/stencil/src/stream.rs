//! Lazy iteration over a top-level list

use std::io::{Read, Seek};
use std::sync::Arc;
use stencil_cache::Template;
use stencil_core::{Config, Formatters, StencilResult, Value};
use stencil_json::{Boundary, SplitCursor};
use stencil_runtime::Machine;

/// Iterator decoding one list element per step.
///
/// Yields nothing for a `null` list. After an error the iterator is
/// exhausted.
pub struct ListStream<'s, 'r, R> {
    resource: &'r mut R,
    cursor: Option<SplitCursor>,
    template: Arc<Template>,
    formatters: &'s Formatters,
    config: &'s Config,
}

impl<'s, 'r, R: Read + Seek> ListStream<'s, 'r, R> {
    pub(crate) fn open(
        resource: &'r mut R,
        template: Arc<Template>,
        formatters: &'s Formatters,
        config: &'s Config,
    ) -> StencilResult<Self> {
        let cursor = SplitCursor::list(&mut *resource, 0, None)?;
        Ok(Self {
            resource,
            cursor,
            template,
            formatters,
            config,
        })
    }

    /// Next element boundary without decoding it
    pub fn next_boundary(&mut self) -> StencilResult<Option<Boundary>> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(None);
        };
        match cursor.next_item(&mut *self.resource) {
            Ok(Some(boundary)) => Ok(Some(boundary)),
            Ok(None) => {
                self.cursor = None;
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "list scan failed, stream closed");
                self.cursor = None;
                Err(e)
            }
        }
    }

    fn decode(&mut self, boundary: Boundary) -> StencilResult<Value> {
        let machine = Machine::new(&self.template.program, self.formatters, self.config);
        Ok(machine.decode_range(&mut *self.resource, boundary)?.value)
    }
}

impl<R: Read + Seek> Iterator for ListStream<'_, '_, R> {
    type Item = StencilResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        let boundary = match self.next_boundary() {
            Ok(boundary) => boundary?,
            Err(e) => return Some(Err(e)),
        };
        let item = self.decode(boundary);
        if let Err(e) = &item {
            tracing::warn!(
                offset = boundary.offset,
                length = boundary.length,
                error = %e,
                "element decode failed, stream closed"
            );
            self.cursor = None;
        }
        Some(item)
    }
}

impl<R> std::fmt::Debug for ListStream<'_, '_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListStream")
            .field("ty", &self.template.key.ty)
            .field("done", &self.cursor.is_none())
            .finish()
    }
}

#[cfg(test)]
#[path = "stream/stream_tests.rs"]
mod stream_tests;
