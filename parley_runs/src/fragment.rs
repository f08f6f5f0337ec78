// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec::Vec;
use core::ops::Range;

use peniko::kurbo::{Point, Rect, Size};

/// A run of glyphs within a line fragment that starts at an anchor point.
///
/// Every line starts with one point. Tabs start further points at their tab stops.
#[derive(Clone, Debug, PartialEq)]
pub struct LinePoint {
    /// The glyphs positioned from this point.
    pub glyph_range: Range<usize>,
    /// Baseline origin of the first glyph, relative to the fragment's origin.
    pub origin: Point,
}

/// An inline object placed within a line fragment.
#[derive(Clone, Debug, PartialEq)]
pub struct LineAttachment {
    /// The glyph standing in for the object.
    pub glyph_range: Range<usize>,
    /// The size of the object.
    pub size: Size,
    /// Top left corner of the object, relative to the fragment's origin.
    pub origin: Point,
}

/// The layout of one visual row of text.
#[derive(Clone, Debug, PartialEq)]
pub struct LineFragment {
    /// The rectangle negotiated with the container.
    pub rect: Rect,
    /// The part of `rect` covered by text, including padding.
    pub used_rect: Rect,
    /// The glyphs on the row.
    pub glyph_range: Range<usize>,
    /// The characters on the row.
    pub char_range: Range<usize>,
    /// Distance from the top of `rect` to the baseline.
    pub baseline: f64,
    /// Anchor points, in glyph order.
    pub points: Vec<LinePoint>,
    /// Inline objects, in glyph order.
    pub attachments: Vec<LineAttachment>,
    /// The soft hyphen shown at the end of the row, if the row breaks at one.
    pub hyphen: Option<usize>,
    /// Glyphs that extend beyond `rect`, in glyph order.
    pub overflowing: Vec<usize>,
}

impl LineFragment {
    /// The anchor point positioning glyph `index`.
    pub fn point_for_glyph(&self, index: usize) -> Option<&LinePoint> {
        self.points
            .iter()
            .find(|point| point.glyph_range.contains(&index))
    }

    /// Moves the character range by `delta`.
    pub(crate) fn shift_chars(&mut self, delta: isize) {
        self.char_range = shift(&self.char_range, delta);
    }

    /// Moves every glyph range so that the fragment starts at glyph `start`.
    pub(crate) fn rebase_glyphs(&mut self, start: usize) {
        let delta = start as isize - self.glyph_range.start as isize;
        self.glyph_range = shift(&self.glyph_range, delta);
        for point in &mut self.points {
            point.glyph_range = shift(&point.glyph_range, delta);
        }
        for attachment in &mut self.attachments {
            attachment.glyph_range = shift(&attachment.glyph_range, delta);
        }
        self.hyphen = self.hyphen.map(|index| index.wrapping_add_signed(delta));
        for index in &mut self.overflowing {
            *index = index.wrapping_add_signed(delta);
        }
    }
}

fn shift(range: &Range<usize>, delta: isize) -> Range<usize> {
    range.start.wrapping_add_signed(delta)..range.end.wrapping_add_signed(delta)
}
