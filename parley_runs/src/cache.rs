// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-container layout caches.

use alloc::collections::VecDeque;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::Cell;
use core::ops::Range;

use peniko::kurbo::{Point, Rect};

use crate::container::TextContainer;
use crate::fragment::LineFragment;

/// Where a container's layout stands relative to the text.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LayoutState {
    /// The laid out fragments match the text.
    #[default]
    Valid,
    /// A prefix of the fragments is valid and the rest is held for reuse.
    PartiallyInvalidated,
    /// Nothing beyond the valid prefix can be reused.
    Invalidated,
}

/// Counters for cache behaviour.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Used rect queries answered from the memo.
    pub used_rect_hits: u64,
    /// Used rect queries that scanned the fragments.
    pub used_rect_scans: u64,
    /// Soft fragments adopted without typesetting their line again.
    pub reused_fragments: u64,
}

/// The layout of one text container.
///
/// Holds the container's valid line fragments, a queue of *soft* fragments kept from
/// before the last invalidation, and a memo of the container's used rect.
#[derive(Debug)]
pub struct ContainerLayout {
    container: Weak<dyn TextContainer>,
    /// Whether layout has reached the end of the container or of the text.
    complete: bool,
    char_range: Range<usize>,
    glyph_range: Range<usize>,
    was_invalidated: bool,
    state: LayoutState,
    fragments: Vec<LineFragment>,
    /// Fragments that were valid before an edit, in text order, with character ranges
    /// already moved to post-edit positions.
    soft: VecDeque<LineFragment>,
    used_rect: Cell<Option<Rect>>,
    stats: Cell<CacheStats>,
    /// The part of the last row the container left free for another fragment.
    remaining: Rect,
}

impl ContainerLayout {
    pub(crate) fn new(container: &Rc<dyn TextContainer>) -> Self {
        Self {
            container: Rc::downgrade(container),
            complete: false,
            char_range: 0..0,
            glyph_range: 0..0,
            was_invalidated: false,
            state: LayoutState::Valid,
            fragments: Vec::new(),
            soft: VecDeque::new(),
            used_rect: Cell::new(None),
            stats: Cell::new(CacheStats::default()),
            remaining: Rect::ZERO,
        }
    }

    /// The container, unless its owner dropped it.
    pub fn container(&self) -> Option<Rc<dyn TextContainer>> {
        self.container.upgrade()
    }

    /// Whether layout reached the end of the container or of the text.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// The characters laid out in the container.
    pub fn char_range(&self) -> Range<usize> {
        self.char_range.clone()
    }

    /// The glyphs laid out in the container.
    pub fn glyph_range(&self) -> Range<usize> {
        self.glyph_range.clone()
    }

    /// Whether the layout was invalidated since the last acknowledgement.
    pub fn was_invalidated(&self) -> bool {
        self.was_invalidated
    }

    /// The invalidation state.
    pub fn state(&self) -> LayoutState {
        self.state
    }

    /// The valid line fragments.
    pub fn fragments(&self) -> &[LineFragment] {
        &self.fragments
    }

    /// The fragments held for reuse.
    pub fn soft_fragments(&self) -> impl Iterator<Item = &LineFragment> + '_ {
        self.soft.iter()
    }

    /// The union of the used rects of all valid fragments, or `Rect::ZERO` when
    /// nothing is laid out.
    ///
    /// Memoized until the fragments change.
    pub fn used_rect(&self) -> Rect {
        let mut stats = self.stats.get();
        let rect = match self.used_rect.get() {
            Some(rect) => {
                stats.used_rect_hits += 1;
                rect
            }
            None => {
                stats.used_rect_scans += 1;
                let rect = self
                    .fragments
                    .iter()
                    .map(|fragment| fragment.used_rect)
                    .reduce(|a, b| a.union(b))
                    .unwrap_or(Rect::ZERO);
                self.used_rect.set(Some(rect));
                rect
            }
        };
        self.stats.set(stats);
        rect
    }

    /// Cache counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.get()
    }

    /// Resets the cache counters.
    pub fn clear_stats(&self) {
        self.stats.set(CacheStats::default());
    }

    /// Index of the fragment holding glyph `index`.
    pub(crate) fn fragment_index_for_glyph(&self, index: usize) -> Option<usize> {
        let i = self
            .fragments
            .partition_point(|fragment| fragment.glyph_range.end <= index);
        self.fragments
            .get(i)
            .is_some_and(|fragment| fragment.glyph_range.contains(&index))
            .then_some(i)
    }

    /// Returns and clears the invalidation flag.
    pub(crate) fn acknowledge_invalidation(&mut self) -> bool {
        core::mem::take(&mut self.was_invalidated)
    }

    pub(crate) fn set_complete(&mut self) {
        self.complete = true;
        self.soft.clear();
        self.state = LayoutState::Valid;
    }

    /// Places the start of the container's text, once the previous container is done.
    pub(crate) fn set_start(&mut self, char_index: usize, glyph_index: usize) {
        if self.fragments.is_empty() {
            self.char_range = char_index..char_index;
            self.glyph_range = glyph_index..glyph_index;
        }
    }

    /// Whether layout never reached the container since it was last emptied.
    pub(crate) fn is_untouched(&self) -> bool {
        !self.complete && self.fragments.is_empty() && self.soft.is_empty()
    }

    /// Where the next line goes: the free part of the last row, or a new row below
    /// the last fragment spanning `width`.
    pub(crate) fn next_row(&self, width: f64) -> (Point, f64) {
        if self.remaining.width() > 0.0 && self.remaining.height() > 0.0 {
            return (self.remaining.origin(), self.remaining.width());
        }
        let y = self.fragments.last().map_or(0.0, |fragment| fragment.rect.y1);
        (Point::new(0.0, y), width)
    }

    pub(crate) fn push_fragment(&mut self, fragment: LineFragment, remaining: Rect) {
        self.remaining = remaining;
        self.char_range.end = fragment.char_range.end;
        self.glyph_range.end = fragment.glyph_range.end;
        self.fragments.push(fragment);
        self.used_rect.set(None);
    }

    /// Removes and returns the soft fragment starting at `char_index` at `origin`.
    ///
    /// Soft fragments that lie behind `char_index` can no longer be reached and are
    /// dropped. A fragment starting at `char_index` somewhere else means the layout
    /// has diverged, so the whole queue is dropped.
    pub(crate) fn take_soft(&mut self, char_index: usize, origin: Point) -> Option<LineFragment> {
        while self
            .soft
            .front()
            .is_some_and(|fragment| fragment.char_range.start < char_index)
        {
            self.soft.pop_front();
        }
        let candidate = self.soft.front()?;
        if candidate.char_range.start != char_index {
            return None;
        }
        if candidate.rect.origin() != origin {
            self.diverged();
            return None;
        }
        self.soft.pop_front()
    }

    pub(crate) fn record_reuse(&self) {
        let mut stats = self.stats.get();
        stats.reused_fragments += 1;
        self.stats.set(stats);
    }

    /// Drops the soft fragments after re-layout produced different geometry.
    pub(crate) fn diverged(&mut self) {
        if !self.soft.is_empty() {
            log::debug!("soft layout diverged, dropping {} fragments", self.soft.len());
        }
        self.soft.clear();
        if self.state == LayoutState::PartiallyInvalidated {
            self.state = LayoutState::Invalidated;
        }
    }

    /// Moves the fragments from `from` on into the soft queue after an edit replaced
    /// `start..old_end` of the old text with text `delta` characters longer.
    ///
    /// Only fragments untouched by the edit stay soft: those ending more than one
    /// character before it, and those starting after it. The latter move by `delta`.
    pub(crate) fn demote(&mut self, from: usize, start: usize, old_end: usize, delta: isize) {
        let demoted = self.fragments.split_off(from.min(self.fragments.len()));
        let previous = core::mem::take(&mut self.soft);
        self.soft = demoted
            .into_iter()
            .chain(previous)
            .filter_map(|mut fragment| {
                if fragment.char_range.end + 1 < start {
                    Some(fragment)
                } else if fragment.char_range.start > old_end {
                    fragment.shift_chars(delta);
                    Some(fragment)
                } else {
                    None
                }
            })
            .collect();
        self.after_invalidation();
        self.state = if self.fragments.is_empty() && self.soft.is_empty() {
            LayoutState::Invalidated
        } else {
            LayoutState::PartiallyInvalidated
        };
    }

    /// Discards every fragment.
    pub(crate) fn invalidate_hard(&mut self) {
        self.fragments.clear();
        self.soft.clear();
        self.after_invalidation();
        self.state = LayoutState::Invalidated;
    }

    fn after_invalidation(&mut self) {
        self.complete = false;
        self.remaining = Rect::ZERO;
        self.was_invalidated = true;
        self.used_rect.set(None);
        match self.fragments.last() {
            Some(last) => {
                self.char_range.end = last.char_range.end;
                self.glyph_range.end = last.glyph_range.end;
            }
            None => {
                self.char_range.end = self.char_range.start;
                self.glyph_range.end = self.glyph_range.start;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec::Vec;

    use peniko::kurbo::{Point, Rect, Size};

    use super::{ContainerLayout, LayoutState};
    use crate::container::{RectContainer, TextContainer};
    use crate::fragment::LineFragment;

    fn fragment(chars: core::ops::Range<usize>, y: f64) -> LineFragment {
        LineFragment {
            rect: Rect::new(0.0, y, 100.0, y + 10.0),
            used_rect: Rect::new(0.0, y, 50.0, y + 10.0),
            glyph_range: chars.clone(),
            char_range: chars,
            baseline: 8.0,
            points: Vec::new(),
            attachments: Vec::new(),
            hyphen: None,
            overflowing: Vec::new(),
        }
    }

    #[test]
    fn used_rect_is_memoized() {
        let container: Rc<dyn TextContainer> = Rc::new(RectContainer::new(Size::new(100.0, 100.0)));
        let mut layout = ContainerLayout::new(&container);
        layout.push_fragment(fragment(0..5, 0.0), Rect::ZERO);
        layout.push_fragment(fragment(5..9, 10.0), Rect::ZERO);

        let first = layout.used_rect();
        let second = layout.used_rect();
        assert_eq!(first, second, "same rect from the memo");
        assert_eq!(first, Rect::new(0.0, 0.0, 50.0, 20.0), "union of both lines");
        assert_eq!(layout.stats().used_rect_scans, 1, "one scan");
        assert_eq!(layout.stats().used_rect_hits, 1, "one hit");
    }

    #[test]
    fn demotion_keeps_untouched_fragments() {
        let container: Rc<dyn TextContainer> = Rc::new(RectContainer::new(Size::new(100.0, 100.0)));
        let mut layout = ContainerLayout::new(&container);
        for (i, y) in [0.0, 10.0, 20.0, 30.0].into_iter().enumerate() {
            layout.push_fragment(fragment(i * 5..i * 5 + 5, y), Rect::ZERO);
        }
        // Replace characters 7..8 with three characters.
        layout.demote(1, 7, 8, 2);
        assert_eq!(layout.fragments().len(), 1, "first line stays valid");
        assert_eq!(layout.state(), LayoutState::PartiallyInvalidated, "soft tail");
        assert!(layout.was_invalidated(), "flag raised");
        let soft: Vec<_> = layout.soft_fragments().map(|f| f.char_range.clone()).collect();
        assert_eq!(soft, [12..17, 17..22], "later lines moved by the delta");

        assert!(layout.take_soft(12, Point::new(0.0, 20.0)).is_some(), "reuse");
        assert!(layout.take_soft(17, Point::new(0.0, 25.0)).is_none(), "moved row");
        assert_eq!(layout.state(), LayoutState::Invalidated, "divergence");
        assert!(layout.acknowledge_invalidation(), "first acknowledgement");
        assert!(!layout.acknowledge_invalidation(), "flag cleared");
    }
}
