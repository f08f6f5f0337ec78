// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::font::FontMetrics;
use crate::generate::Generator;
use crate::glyph::Glyph;
use crate::run::{RunId, Span};
use crate::text::TextStore;

/// The run the cursor last read from.
#[derive(Copy, Clone, Debug)]
struct CachedRun {
    id: RunId,
    start: Span,
    /// Store stamp at lookup time. Any structural change invalidates the entry.
    stamp: u64,
}

/// Steps through glyphs in order, generating them on demand.
///
/// Consecutive glyphs of one run are read without another skip list descent.
///
/// Created by [`LayoutManager::glyph_cursor`](crate::LayoutManager::glyph_cursor).
pub struct GlyphCursor<'a, T: TextStore + ?Sized, F: FontMetrics + ?Sized> {
    generator: Generator<'a, T, F>,
    /// Index of the glyph [`GlyphCursor::next`] returns.
    index: usize,
    cached: Option<CachedRun>,
}

impl<'a, T: TextStore + ?Sized, F: FontMetrics + ?Sized> GlyphCursor<'a, T, F> {
    pub(crate) fn new(generator: Generator<'a, T, F>, index: usize) -> Self {
        Self {
            generator,
            index,
            cached: None,
        }
    }

    /// The index of the glyph the next call to `next` returns.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Moves the cursor so that `next` returns glyph `index`.
    pub fn seek(&mut self, index: usize) {
        self.index = index;
    }

    /// Steps back and returns the glyph before the cursor.
    pub fn prev(&mut self) -> Option<Glyph> {
        let index = self.index.checked_sub(1)?;
        let glyph = self.read(index)?;
        self.index = index;
        Some(glyph)
    }

    fn read(&mut self, index: usize) -> Option<Glyph> {
        self.generator.generate_up_to_glyph(index);
        let store = &*self.generator.store;
        if index >= store.prefix_glyphs() {
            return None;
        }
        let hit = self.cached.filter(|cached| {
            cached.stamp == store.stamp()
                && cached.start.glyphs <= index
                && index < cached.start.glyphs + store.node(cached.id).glyph_length()
        });
        let cached = match hit {
            Some(cached) => cached,
            None => {
                // Stepping off the end of the cached run continues in the next one.
                let following = self
                    .cached
                    .filter(|cached| cached.stamp == store.stamp())
                    .and_then(|cached| {
                        let end = cached.start + store.node(cached.id).extent();
                        let next = store.next_run(cached.id)?;
                        let next_end = end.glyphs + store.node(next).glyph_length();
                        (end.glyphs == index && index < next_end).then_some((next, end))
                    });
                let (id, start) = following.unwrap_or_else(|| store.locate_glyph(index));
                let cached = CachedRun {
                    id,
                    start,
                    stamp: store.stamp(),
                };
                self.cached = Some(cached);
                cached
            }
        };
        Some(
            store
                .node(cached.id)
                .glyph(cached.start.chars, index - cached.start.glyphs),
        )
    }
}

impl<T: TextStore + ?Sized, F: FontMetrics + ?Sized> Iterator for GlyphCursor<'_, T, F> {
    type Item = Glyph;

    fn next(&mut self) -> Option<Glyph> {
        let glyph = self.read(self.index)?;
        self.index += 1;
        Some(glyph)
    }
}

impl<T: TextStore + ?Sized, F: FontMetrics + ?Sized> core::fmt::Debug for GlyphCursor<'_, T, F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GlyphCursor")
            .field("index", &self.index)
            .field("cached", &self.cached)
            .finish_non_exhaustive()
    }
}
