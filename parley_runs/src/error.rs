// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::font::FontId;

/// Error type for layout manager queries and text edits.
///
/// Carries a non-exhaustive [`ErrorKind`] plus the offending index and the bound it
/// was checked against. Indices equal to the length of the document are valid
/// wherever an "end" position makes sense, so the bound is reported exactly rather
/// than clamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// The non-exhaustive category describing this error.
    kind: ErrorKind,

    /// The offending index, or the start of the offending range.
    index: usize,

    /// The end (exclusive) of the offending range, equal to `index` for single indices.
    end: usize,

    /// The bound the index was checked against.
    len: usize,
}

#[expect(
    clippy::len_without_is_empty,
    reason = "`Error::len` reports the bound the index was checked against; `is_empty` would be meaningless."
)]
impl Error {
    /// The machine-readable category for this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The offending index, or the start of the offending range.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The end (exclusive) of the offending range.
    ///
    /// Equal to [`Error::index`] for errors about a single index.
    pub fn end(&self) -> usize {
        self.end
    }

    /// The number of characters, glyphs or containers the index was checked against.
    pub fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn character_out_of_bounds(index: usize, len: usize) -> Self {
        Self {
            kind: ErrorKind::CharacterIndexOutOfBounds,
            index,
            end: index,
            len,
        }
    }

    pub(crate) fn glyph_out_of_bounds(index: usize, len: usize) -> Self {
        Self {
            kind: ErrorKind::GlyphIndexOutOfBounds,
            index,
            end: index,
            len,
        }
    }

    pub(crate) fn invalid_range(start: usize, end: usize, len: usize) -> Self {
        Self {
            kind: ErrorKind::InvalidRange,
            index: start,
            end,
            len,
        }
    }

    pub(crate) fn no_such_container(index: usize, len: usize) -> Self {
        Self {
            kind: ErrorKind::NoSuchContainer,
            index,
            end: index,
            len,
        }
    }

    pub(crate) fn container_detached(index: usize, len: usize) -> Self {
        Self {
            kind: ErrorKind::ContainerDetached,
            index,
            end: index,
            len,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.kind {
            ErrorKind::CharacterIndexOutOfBounds => write!(
                f,
                "character index {} out of bounds for length {}",
                self.index, self.len
            ),
            ErrorKind::GlyphIndexOutOfBounds => write!(
                f,
                "glyph index {} out of bounds for {} glyphs",
                self.index, self.len
            ),
            ErrorKind::InvalidRange => write!(
                f,
                "invalid range {}..{} for length {}",
                self.index, self.end, self.len
            ),
            ErrorKind::NoSuchContainer => write!(
                f,
                "no text container at index {} ({} containers)",
                self.index, self.len
            ),
            ErrorKind::ContainerDetached => write!(
                f,
                "text container at index {} was dropped and has been detached",
                self.index
            ),
        }
    }
}

impl core::error::Error for Error {}

/// The non-exhaustive category of an error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A character index was greater than the length of the text.
    CharacterIndexOutOfBounds,

    /// A glyph index was beyond the glyphs the text can produce.
    GlyphIndexOutOfBounds,

    /// A range had `start > end`, or extended past the end of the text.
    InvalidRange,

    /// A text container index did not name a container of the layout manager.
    NoSuchContainer,

    /// The text container was dropped by its owner.
    ContainerDetached,
}

/// A non-fatal condition recovered from during glyph generation.
///
/// Diagnostics are collected by the layout manager and drained with
/// [`LayoutManager::take_diagnostics`](crate::LayoutManager::take_diagnostics).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// The font could not map a character, and the missing glyph was substituted.
    MissingGlyph {
        /// The index of the unmapped character.
        char_index: usize,
        /// The unmapped character.
        ch: char,
        /// The font that was asked for the character.
        font: FontId,
    },
}

/// Aborts on a broken run store invariant.
///
/// These are bugs in this crate rather than caller errors, so they are never surfaced
/// as [`Error`]s.
#[cold]
#[track_caller]
pub(crate) fn consistency_failure(args: core::fmt::Arguments<'_>) -> ! {
    panic!("run store consistency failure: {args}")
}
