// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec::Vec;
use core::ops::{Add, Range, Sub};

use smallvec::SmallVec;

use crate::font::FontId;
use crate::glyph::{Glyph, GlyphRecord};

/// Handle to a run inside a [`RunStore`](crate::RunStore).
///
/// Handles are only meaningful until the next structural change of the store: runs
/// removed by an edit or a merge free their slot for reuse.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RunId(pub(crate) u32);

impl RunId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Attributes shared by every glyph of a run.
///
/// Two adjacent runs with equal attributes are *continued*: the second could have
/// been part of the first.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RunAttributes {
    /// The resolved font.
    pub font: FontId,
    /// The bidi embedding level.
    pub bidi_level: u8,
    /// The ligature substitution index.
    pub ligature: u8,
    /// Whether explicit kerning replaces font kerning.
    pub explicit_kerning: bool,
}

/// A character and glyph count.
///
/// Used both for the extent of one run and for the distance a skip list link covers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Span {
    pub(crate) chars: usize,
    pub(crate) glyphs: usize,
}

impl Span {
    pub(crate) const ZERO: Self = Self {
        chars: 0,
        glyphs: 0,
    };
}

impl Add for Span {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            chars: self.chars + rhs.chars,
            glyphs: self.glyphs + rhs.glyphs,
        }
    }
}

impl Sub for Span {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            chars: self.chars - rhs.chars,
            glyphs: self.glyphs - rhs.glyphs,
        }
    }
}

/// One forward link of a run.
///
/// `span` covers this run and every run up to, but excluding, `next`.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct Link {
    pub(crate) next: Option<RunId>,
    pub(crate) span: Span,
}

#[derive(Clone, Debug)]
pub(crate) struct Run {
    /// Forward links, one per level from `0` to the run's level.
    pub(crate) links: SmallVec<[Link; 4]>,
    /// The previous run on level `0`, `None` for the first run.
    pub(crate) prev: Option<RunId>,
    pub(crate) char_length: usize,
    /// Number of leading characters covered by `glyphs`.
    pub(crate) generated_chars: usize,
    pub(crate) complete: bool,
    pub(crate) continued: bool,
    /// `None` until generation reaches the run and resolves them.
    pub(crate) attributes: Option<RunAttributes>,
    pub(crate) glyphs: Vec<GlyphRecord>,
}

impl Run {
    pub(crate) fn new(level: usize, char_length: usize) -> Self {
        Self {
            links: (0..=level).map(|_| Link::default()).collect(),
            prev: None,
            char_length,
            generated_chars: 0,
            complete: char_length == 0,
            continued: false,
            attributes: None,
            glyphs: Vec::new(),
        }
    }

    pub(crate) fn level(&self) -> usize {
        self.links.len() - 1
    }

    pub(crate) fn glyph_length(&self) -> usize {
        self.glyphs.len()
    }

    pub(crate) fn extent(&self) -> Span {
        Span {
            chars: self.char_length,
            glyphs: self.glyphs.len(),
        }
    }

    /// The glyph at `index` of this run, for a run starting at character `char_start`.
    pub(crate) fn glyph(&self, char_start: usize, index: usize) -> Glyph {
        let record = &self.glyphs[index];
        Glyph {
            id: record.id,
            char_index: char_start + record.char_offset(),
            flags: record.flags,
            bidi_level: record.bidi_level,
            advancement: record.advancement,
            font: self.attributes.unwrap_or_default().font,
        }
    }

    /// The index of the glyph owning the character at `offset`.
    ///
    /// The character must be generated.
    pub(crate) fn glyph_index_for_offset(&self, offset: usize) -> usize {
        self.glyphs
            .partition_point(|glyph| glyph.char_offset() <= offset)
            .saturating_sub(1)
    }

    pub(crate) fn update_complete(&mut self) {
        self.complete = self.generated_chars == self.char_length;
    }

    /// Drops glyphs so that generation resumes no later than `offset`.
    ///
    /// The cluster holding the character before `offset` is dropped as well, since the
    /// character at `offset` may now combine with it.
    pub(crate) fn truncate_generated(&mut self, offset: usize) {
        if offset > self.generated_chars {
            return;
        }
        let keep = match offset.checked_sub(1) {
            Some(last) => self
                .glyphs
                .partition_point(|glyph| glyph.char_offset() <= last)
                .saturating_sub(1),
            None => 0,
        };
        self.generated_chars = self.glyphs.get(keep).map_or(0, GlyphRecord::char_offset);
        self.glyphs.truncate(keep);
        if self.generated_chars == 0 {
            self.attributes = None;
            self.continued = false;
        }
        self.update_complete();
    }

    /// Splits off the characters from `offset` on into a new run of the given level.
    ///
    /// Glyphs of a cluster straddling `offset` are dropped on both sides. The tail keeps
    /// the attributes only if it keeps glyphs too.
    pub(crate) fn split_off(&mut self, offset: usize, level: usize) -> Self {
        let mut tail = Self::new(level, self.char_length - offset);
        tail.attributes = self.attributes;
        tail.continued = self.attributes.is_some();

        let at = self
            .glyphs
            .partition_point(|glyph| glyph.char_offset() < offset);
        let clean = at == self.glyphs.len() && self.generated_chars <= offset
            || self.glyphs.get(at).is_some_and(|glyph| glyph.char_offset() == offset);
        if clean {
            tail.glyphs = self.glyphs.split_off(at);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "offsets are within a run, whose glyph offsets already fit in u32"
            )]
            let shift = offset as u32;
            for glyph in &mut tail.glyphs {
                glyph.char_offset -= shift;
            }
            tail.generated_chars = self.generated_chars.saturating_sub(offset);
            self.generated_chars = self.generated_chars.min(offset);
        } else {
            let keep = at.saturating_sub(1);
            self.generated_chars = self.glyphs.get(keep).map_or(0, GlyphRecord::char_offset);
            self.glyphs.truncate(keep);
        }
        if tail.generated_chars == 0 {
            tail.glyphs.clear();
            tail.attributes = None;
            tail.continued = false;
        }
        if self.generated_chars == 0 {
            self.attributes = None;
            self.continued = false;
        }
        self.char_length = offset;
        self.update_complete();
        tail.update_complete();
        tail
    }

    /// Appends the characters of `next` to this run.
    ///
    /// Glyphs of `next` are only kept when this run is complete, so that the generated
    /// glyphs stay a prefix of the run.
    pub(crate) fn absorb(&mut self, next: Self) {
        let base = self.char_length;
        if self.complete {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "merged runs stay within the maximum run length"
            )]
            let shift = base as u32;
            self.glyphs
                .extend(next.glyphs.into_iter().map(|mut glyph| {
                    glyph.char_offset += shift;
                    glyph
                }));
            self.generated_chars = base + next.generated_chars;
        }
        self.char_length += next.char_length;
        self.update_complete();
    }
}

/// Summary of one run, as reported by [`RunStore::runs`](crate::RunStore::runs).
#[derive(Clone, Debug, PartialEq)]
pub struct RunInfo {
    /// The run's handle.
    pub id: RunId,
    /// The characters the run spans.
    pub char_range: Range<usize>,
    /// The glyphs the run currently holds.
    pub glyph_range: Range<usize>,
    /// The run's skip list level.
    pub level: usize,
    /// Whether glyph generation has reached the end of the run.
    pub complete: bool,
    /// Whether the run has the same attributes as the run before it.
    pub continued: bool,
    /// The attributes, once generation has resolved them.
    pub attributes: Option<RunAttributes>,
}

/// The result of looking up a run by character or glyph index.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RunPosition {
    /// The run holding the index, or `None` for the position one past the last glyph.
    pub run: Option<RunId>,
    /// The glyph index at the start of the run.
    pub glyph_start: usize,
    /// The character index at the start of the run.
    pub char_start: usize,
}
