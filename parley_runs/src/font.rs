// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Font metrics collaborators.

use core::ops::RangeInclusive;

use hashbrown::HashMap;
use peniko::kurbo::Size;

use crate::glyph::GlyphId;
use crate::util::is_combining_mark;

/// Handle to a font known to a [`FontMetrics`] provider.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(pub u32);

/// Source of glyph identifiers and metrics.
pub trait FontMetrics {
    /// Maps a character to a glyph, or `None` if the font has no glyph for it.
    fn glyph_for_character(&self, font: FontId, ch: char) -> Option<GlyphId>;

    /// Returns the ligature glyph replacing the pair `first`, `second`, if any.
    fn ligature(&self, font: FontId, first: char, second: char) -> Option<GlyphId> {
        let _ = (font, first, second);
        None
    }

    /// The advance of `glyph` when set in `font`.
    fn advancement(&self, font: FontId, glyph: GlyphId) -> Size;

    /// Distance from the baseline to the top of the font's line box.
    fn ascender(&self, font: FontId) -> f64;

    /// Distance from the baseline to the bottom of the font's line box.
    ///
    /// Negative for fonts that descend below the baseline.
    fn descender(&self, font: FontId) -> f64;

    /// The height of a line set in `font`.
    fn line_height(&self, font: FontId) -> f64 {
        self.ascender(font) - self.descender(font)
    }
}

/// A synthetic font face with uniform advances.
///
/// Every covered character advances by the same width, apart from combining marks which
/// take no space.
#[derive(Clone, Debug)]
pub struct FontFace {
    size: f64,
    ascender: f64,
    descender: f64,
    advance: f64,
    coverage: Option<RangeInclusive<char>>,
    ligatures: HashMap<(char, char), GlyphId>,
    glyph_advances: HashMap<GlyphId, f64>,
}

impl FontFace {
    /// First glyph identifier handed out for ligatures.
    const LIGATURE_BASE: u32 = 0x0020_0000;

    /// Creates a face of the given point size covering every character.
    pub fn new(size: f64) -> Self {
        Self {
            size,
            ascender: size * 0.8,
            descender: -size * 0.2,
            advance: size * 0.6,
            coverage: None,
            ligatures: HashMap::new(),
            glyph_advances: HashMap::new(),
        }
    }

    /// Sets the advance of every covered character.
    pub fn with_advance(mut self, advance: f64) -> Self {
        self.advance = advance;
        self
    }

    /// Sets the ascender and descender.
    pub fn with_metrics(mut self, ascender: f64, descender: f64) -> Self {
        self.ascender = ascender;
        self.descender = descender;
        self
    }

    /// Restricts the characters the face has glyphs for.
    pub fn with_coverage(mut self, coverage: RangeInclusive<char>) -> Self {
        self.coverage = Some(coverage);
        self
    }

    /// Adds a ligature replacing `first` followed by `second` with a single glyph.
    pub fn with_ligature(mut self, first: char, second: char, advance: f64) -> Self {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "a face never registers billions of ligatures"
        )]
        let id = GlyphId(Self::LIGATURE_BASE + self.ligatures.len() as u32);
        self.ligatures.insert((first, second), id);
        self.glyph_advances.insert(id, advance);
        self
    }

    /// The point size of the face.
    pub fn size(&self) -> f64 {
        self.size
    }

    fn covers(&self, ch: char) -> bool {
        self.coverage.as_ref().is_none_or(|range| range.contains(&ch))
    }

    fn glyph_advance(&self, glyph: GlyphId) -> f64 {
        if let Some(advance) = self.glyph_advances.get(&glyph) {
            return *advance;
        }
        if glyph == GlyphId::NOTDEF {
            return self.size * 0.5;
        }
        match char::from_u32(glyph.0.wrapping_sub(1)) {
            Some(ch) if is_combining_mark(ch) => 0.0,
            _ => self.advance,
        }
    }
}

/// A registry of [`FontFace`]s implementing [`FontMetrics`].
///
/// Glyph identifiers are the character's scalar value plus one, so that
/// [`GlyphId::NOTDEF`] stays free.
#[derive(Clone, Debug, Default)]
pub struct FontCollection {
    faces: HashMap<FontId, FontFace>,
    next_id: u32,
}

impl FontCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a face and returns its handle.
    ///
    /// The first registered face gets `FontId(0)`, the default font of
    /// [`TextAttributes`](crate::TextAttributes).
    pub fn add(&mut self, face: FontFace) -> FontId {
        let id = FontId(self.next_id);
        self.next_id += 1;
        self.faces.insert(id, face);
        id
    }

    /// Returns the face registered for `font`.
    pub fn face(&self, font: FontId) -> Option<&FontFace> {
        self.faces.get(&font)
    }

    /// Returns the number of registered faces.
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// Returns `true` if no face has been registered.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

impl FontMetrics for FontCollection {
    fn glyph_for_character(&self, font: FontId, ch: char) -> Option<GlyphId> {
        let face = self.faces.get(&font)?;
        face.covers(ch).then(|| GlyphId(ch as u32 + 1))
    }

    fn ligature(&self, font: FontId, first: char, second: char) -> Option<GlyphId> {
        self.faces.get(&font)?.ligatures.get(&(first, second)).copied()
    }

    fn advancement(&self, font: FontId, glyph: GlyphId) -> Size {
        match self.faces.get(&font) {
            Some(face) => Size::new(face.glyph_advance(glyph), face.ascender - face.descender),
            None => Size::ZERO,
        }
    }

    fn ascender(&self, font: FontId) -> f64 {
        self.faces.get(&font).map_or(0.0, |face| face.ascender)
    }

    fn descender(&self, font: FontId) -> f64 {
        self.faces.get(&font).map_or(0.0, |face| face.descender)
    }
}
