// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use peniko::kurbo::Size;

use crate::font::FontId;

/// Identifier of a glyph within its font.
///
/// Opaque to the layout manager apart from the two reserved values below.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlyphId(pub u32);

impl GlyphId {
    /// The placeholder substituted when a font cannot map a character.
    pub const NOTDEF: Self = Self(0);
    /// Glyph produced for control characters, tabs, line breaks and attachments.
    ///
    /// It is never drawn from a font.
    pub const CONTROL: Self = Self(0x00FF_FFFF);
}

/// How a glyph is placed relative to the glyph before it.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub enum Inscription {
    /// Normal glyph that advances the pen.
    #[default]
    Base,
    /// Glyph that takes no space and is not drawn.
    Null,
    /// Glyph drawn above the preceding glyph.
    Above,
    /// Glyph drawn below the preceding glyph.
    Below,
    /// Glyph drawn over the preceding glyph.
    Overstrike,
}

/// Per-glyph layout flags.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct GlyphFlags {
    /// The glyph extends beyond the line fragment it was laid out in.
    pub draws_outside_line_fragment: bool,
    /// The glyph takes part in layout but is not drawn.
    pub is_not_shown: bool,
    /// How the glyph is placed.
    pub inscription: Inscription,
    /// The glyph is a soft break point (a soft hyphen).
    pub soft: bool,
    /// The glyph may be stretched when justifying (whitespace).
    pub elastic: bool,
}

/// A glyph as stored inside a run.
///
/// The character offset is relative to the start of the owning run, so runs after an
/// edit never need their glyphs rewritten.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct GlyphRecord {
    pub(crate) id: GlyphId,
    pub(crate) char_offset: u32,
    pub(crate) flags: GlyphFlags,
    pub(crate) bidi_level: u8,
    pub(crate) advancement: Size,
}

impl GlyphRecord {
    pub(crate) fn char_offset(&self) -> usize {
        self.char_offset as usize
    }
}

/// A materialized glyph together with its position in the text.
///
/// All characters from [`Glyph::char_index`] up to the next glyph's character index
/// map to this glyph.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Glyph {
    /// The glyph identifier.
    pub id: GlyphId,
    /// The first character this glyph maps to.
    pub char_index: usize,
    /// Layout flags.
    pub flags: GlyphFlags,
    /// Bidi embedding level of the glyph.
    pub bidi_level: u8,
    /// The nominal advance of the glyph.
    pub advancement: Size,
    /// The font of the run holding the glyph.
    pub font: FontId,
}

impl Glyph {
    /// The horizontal space the glyph takes up on a line.
    ///
    /// Glyphs that are not shown take no space.
    pub fn effective_advance(&self) -> f64 {
        if self.flags.is_not_shown {
            0.0
        } else {
            self.advancement.width
        }
    }
}
