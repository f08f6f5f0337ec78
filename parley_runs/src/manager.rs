// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The layout manager: glyph storage, per-container layout and the invalidation
//! protocol between them.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::ops::Range;

use peniko::kurbo::{Point, Rect};

use crate::cache::ContainerLayout;
use crate::container::TextContainer;
use crate::cursor::GlyphCursor;
use crate::error::{consistency_failure, Diagnostic, Error};
use crate::font::FontMetrics;
use crate::fragment::LineFragment;
use crate::generate::Generator;
use crate::glyph::Glyph;
use crate::options::LayoutOptions;
use crate::run::RunPosition;
use crate::store::RunStore;
use crate::text::{TextEdit, TextStore};
use crate::typeset::{apply_line_flags, typeset_line, LineOutcome};

/// How far a layout pass has to go.
#[derive(Copy, Clone, Debug)]
enum LayoutTarget {
    /// Until the character at this index is laid out.
    Character(usize),
    /// Until the glyph at this index is laid out.
    Glyph(usize),
    /// Until the container at this index is complete.
    Container(usize),
}

/// Lazily generates glyphs for a text and lays them out in a sequence of containers.
///
/// The manager owns the text and the font provider, so that every change to the text
/// goes through [`LayoutManager::edit_text`] and invalidates exactly the glyphs and
/// line fragments it affects. Containers are shared with the caller and only
/// referenced weakly.
///
/// Queries that need glyphs or layout take `&mut self` and do the minimum of work to
/// answer. The drawing queries take `&self` and only read what already exists.
#[derive(Debug)]
pub struct LayoutManager<T, F> {
    text: T,
    fonts: F,
    options: LayoutOptions,
    store: RunStore,
    layouts: Vec<ContainerLayout>,
    diagnostics: Vec<Diagnostic>,
}

impl<T: TextStore, F: FontMetrics> LayoutManager<T, F> {
    /// Creates a layout manager with default options.
    pub fn new(text: T, fonts: F) -> Self {
        Self::with_options(text, fonts, LayoutOptions::default())
    }

    /// Creates a layout manager.
    pub fn with_options(text: T, fonts: F, options: LayoutOptions) -> Self {
        let store = Self::build_store(&options, text.len());
        Self {
            text,
            fonts,
            options,
            store,
            layouts: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn build_store(options: &LayoutOptions, len: usize) -> RunStore {
        let mut store = RunStore::new(options.max_run_length, options.skip_list_seed);
        store.apply_edit(0, 0, len);
        store
    }

    /// The text.
    pub fn text(&self) -> &T {
        &self.text
    }

    /// The font provider.
    pub fn fonts(&self) -> &F {
        &self.fonts
    }

    /// The options the manager was created with.
    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// The run store, for inspection.
    pub fn run_store(&self) -> &RunStore {
        &self.store
    }

    fn generator(&mut self) -> Generator<'_, T, F> {
        Generator::new(
            &mut self.store,
            &self.text,
            &self.fonts,
            &self.options,
            &mut self.diagnostics,
        )
    }

    /// Edits the text and invalidates what the edit touched.
    ///
    /// The closure reports the edit it made as a [`TextEdit`] in post-edit
    /// coordinates, as the [`AttributedString`](crate::AttributedString) editing
    /// methods do.
    ///
    /// If the reported edit does not match the change in the text's length, every
    /// glyph and line fragment is discarded and an [`ErrorKind::InvalidRange`] error is
    /// returned.
    ///
    /// [`ErrorKind::InvalidRange`]: crate::ErrorKind::InvalidRange
    pub fn edit_text(
        &mut self,
        edit: impl FnOnce(&mut T) -> Result<TextEdit, Error>,
    ) -> Result<TextEdit, Error> {
        let edit = edit(&mut self.text)?;
        self.text_edited(&edit)?;
        Ok(edit)
    }

    fn text_edited(&mut self, edit: &TextEdit) -> Result<(), Error> {
        let old_len = self.store.len();
        let new_len = self.text.len();
        let start = edit.range.start;
        let removed = edit.removed();
        let consistent = edit.range.end <= new_len
            && start.checked_add(removed).is_some_and(|end| end <= old_len)
            && old_len.checked_add_signed(edit.delta) == Some(new_len);
        if !consistent {
            log::warn!(
                "edit {:?} (delta {}) does not match a text of {old_len} -> {new_len} characters",
                edit.range,
                edit.delta
            );
            self.store = Self::build_store(&self.options, new_len);
            for layout in &mut self.layouts {
                layout.invalidate_hard();
            }
            return Err(Error::invalid_range(edit.range.start, edit.range.end, new_len));
        }
        self.store.apply_edit(start, removed, edit.inserted());
        self.invalidate_layout(start, start + removed, edit.delta);
        Ok(())
    }

    /// Discards every glyph and line fragment, for changes affecting the whole text
    /// such as a new font provider state.
    pub fn invalidate_everything(&mut self) {
        log::debug!("invalidating all glyphs and layout");
        self.store.invalidate_all();
        for layout in &mut self.layouts {
            if !layout.is_untouched() {
                layout.invalidate_hard();
            }
        }
    }

    /// Invalidates the layout of the lines holding the characters in `range`, keeping
    /// unaffected lines for reuse.
    pub fn invalidate_layout_for_character_range(
        &mut self,
        range: Range<usize>,
    ) -> Result<(), Error> {
        self.check_character_range(&range)?;
        self.invalidate_layout(range.start, range.end, 0);
        Ok(())
    }

    /// Demotes line fragments after `start..old_end` of the old text was replaced by
    /// text `delta` characters longer.
    ///
    /// The line before the one holding `start` is demoted too, since the edit may let
    /// text move back into it.
    fn invalidate_layout(&mut self, start: usize, old_end: usize, delta: isize) {
        let mut previous = None;
        let mut first_after = None;
        'search: for (k, layout) in self.layouts.iter().enumerate() {
            for (i, fragment) in layout.fragments().iter().enumerate() {
                if fragment.char_range.end > start {
                    first_after = Some((k, i));
                    break 'search;
                }
                previous = Some((k, i, fragment.char_range.end));
            }
        }
        let from = match (first_after, previous) {
            (Some(_), Some((k, i, _))) => Some((k, i)),
            (Some(position), None) => Some(position),
            (None, Some((k, i, end))) if end == start => Some((k, i)),
            // Nothing laid out reaches the edit, unless a container ended with the text.
            (None, _) => self
                .layouts
                .iter()
                .position(|layout| layout.is_complete() && layout.char_range().end >= start)
                .map(|k| (k, self.layouts[k].fragments().len())),
        };
        let Some((k, i)) = from else {
            // Soft fragments past the laid out text may still overlap the edit.
            for layout in &mut self.layouts {
                if layout.soft_fragments().next().is_some() {
                    let end = layout.fragments().len();
                    layout.demote(end, start, old_end, delta);
                }
            }
            return;
        };
        self.layouts[k].demote(i, start, old_end, delta);
        for layout in &mut self.layouts[k + 1..] {
            if !layout.is_untouched() {
                layout.demote(0, start, old_end, delta);
            }
        }
    }

    // --- Containers ---

    /// Appends a container and returns its index.
    pub fn add_text_container(&mut self, container: Rc<dyn TextContainer>) -> usize {
        self.layouts.push(ContainerLayout::new(&container));
        self.layouts.len() - 1
    }

    /// Inserts a container at `index`. Text flowing through the containers after it
    /// is laid out again.
    pub fn insert_text_container(
        &mut self,
        index: usize,
        container: Rc<dyn TextContainer>,
    ) -> Result<(), Error> {
        if index > self.layouts.len() {
            return Err(Error::no_such_container(index, self.layouts.len()));
        }
        self.layouts.insert(index, ContainerLayout::new(&container));
        self.invalidate_containers_from(index + 1);
        Ok(())
    }

    /// Removes the container at `index`. Text flowing through the containers after it
    /// is laid out again.
    pub fn remove_text_container(&mut self, index: usize) -> Result<(), Error> {
        self.check_container(index)?;
        self.layouts.remove(index);
        self.invalidate_containers_from(index);
        Ok(())
    }

    /// The number of containers.
    pub fn text_container_count(&self) -> usize {
        self.layouts.len()
    }

    /// The container at `index`, unless it does not exist or was dropped.
    pub fn text_container(&self, index: usize) -> Option<Rc<dyn TextContainer>> {
        self.layouts.get(index)?.container()
    }

    /// The layout cache of the container at `index`.
    pub fn container_layout(&self, index: usize) -> Result<&ContainerLayout, Error> {
        self.check_container(index)
    }

    /// Discards the layout of the container at `index` and of every container after it,
    /// after the container changed size or shape.
    pub fn text_container_changed_geometry(&mut self, index: usize) -> Result<(), Error> {
        self.check_container(index)?;
        log::debug!("text container {index} changed geometry");
        self.invalidate_containers_from(index);
        Ok(())
    }

    /// Returns and clears the container's invalidation flag.
    ///
    /// Returns `true` exactly once after each event that invalidated the container's
    /// layout.
    pub fn acknowledge_invalidation(&mut self, index: usize) -> Result<bool, Error> {
        self.check_container(index)?;
        Ok(self.layouts[index].acknowledge_invalidation())
    }

    fn invalidate_containers_from(&mut self, index: usize) {
        for layout in self.layouts.iter_mut().skip(index) {
            if !layout.is_untouched() {
                layout.invalidate_hard();
            }
        }
    }

    fn check_container(&self, index: usize) -> Result<&ContainerLayout, Error> {
        self.layouts
            .get(index)
            .ok_or_else(|| Error::no_such_container(index, self.layouts.len()))
    }

    fn live_layout(&self, index: usize) -> Result<&ContainerLayout, Error> {
        let layout = self.check_container(index)?;
        if layout.container().is_none() {
            return Err(Error::container_detached(index, self.layouts.len()));
        }
        Ok(layout)
    }

    // --- Glyphs ---

    fn check_character(&self, index: usize) -> Result<(), Error> {
        if index > self.text.len() {
            return Err(Error::character_out_of_bounds(index, self.text.len()));
        }
        Ok(())
    }

    fn check_character_range(&self, range: &Range<usize>) -> Result<(), Error> {
        if range.start > range.end || range.end > self.text.len() {
            return Err(Error::invalid_range(range.start, range.end, self.text.len()));
        }
        Ok(())
    }

    /// Generates glyphs for every character up to and including `index`.
    pub fn generate_up_to_character(&mut self, index: usize) -> Result<(), Error> {
        self.check_character(index)?;
        self.generator().generate_up_to_character(index);
        Ok(())
    }

    /// Generates glyphs until glyph `index` exists.
    ///
    /// `index` may be one past the last glyph.
    pub fn generate_up_to_glyph(&mut self, index: usize) -> Result<(), Error> {
        self.generator().generate_up_to_glyph(index);
        let available = self.store.prefix_glyphs();
        if index > available {
            return Err(Error::glyph_out_of_bounds(index, available));
        }
        Ok(())
    }

    /// The run holding character `index`, generating glyphs up to it.
    ///
    /// A character on a run boundary belongs to the run starting there. The length of
    /// the text is a valid index and maps to the position after the last run.
    pub fn run_for_character_index(&mut self, index: usize) -> Result<RunPosition, Error> {
        self.check_character(index)?;
        if index == self.text.len() {
            return Ok(self.end_position());
        }
        self.generator().generate_up_to_character(index);
        let (id, start) = self.store.locate_char(index);
        Ok(RunPosition {
            run: Some(id),
            glyph_start: start.glyphs,
            char_start: start.chars,
        })
    }

    /// The run holding glyph `index`, generating glyphs up to it.
    ///
    /// The number of glyphs is a valid index and maps to the position after the last
    /// run.
    pub fn run_for_glyph_index(&mut self, index: usize) -> Result<RunPosition, Error> {
        self.generate_up_to_glyph(index)?;
        if index == self.store.prefix_glyphs() {
            return Ok(self.end_position());
        }
        let (id, start) = self.store.locate_glyph(index);
        Ok(RunPosition {
            run: Some(id),
            glyph_start: start.glyphs,
            char_start: start.chars,
        })
    }

    fn end_position(&mut self) -> RunPosition {
        self.generator().generate_all();
        RunPosition {
            run: None,
            glyph_start: self.store.glyph_count(),
            char_start: self.text.len(),
        }
    }

    /// A cursor over the glyphs starting at glyph `index`.
    pub fn glyph_cursor(&mut self, index: usize) -> GlyphCursor<'_, T, F> {
        GlyphCursor::new(self.generator(), index)
    }

    /// The number of glyphs for the whole text. Generates every glyph.
    pub fn number_of_glyphs(&mut self) -> usize {
        self.generator().generate_all();
        self.store.glyph_count()
    }

    /// The glyph at `index`.
    pub fn glyph_at_index(&mut self, index: usize) -> Result<Glyph, Error> {
        match self.generator().glyph(index) {
            Some(glyph) => Ok(glyph),
            None => Err(Error::glyph_out_of_bounds(index, self.store.glyph_count())),
        }
    }

    /// Returns `true` if the text has a glyph at `index`.
    pub fn is_valid_glyph_index(&mut self, index: usize) -> bool {
        self.generator().glyph(index).is_some()
    }

    /// The index of the glyph that character `index` maps to.
    ///
    /// The length of the text maps to the number of glyphs.
    pub fn glyph_index_for_character(&mut self, index: usize) -> Result<usize, Error> {
        self.check_character(index)?;
        Ok(glyph_boundary(&mut self.generator(), index))
    }

    /// The first character glyph `index` maps to.
    ///
    /// The number of glyphs maps to the length of the text.
    pub fn character_index_for_glyph(&mut self, index: usize) -> Result<usize, Error> {
        if let Some(glyph) = self.generator().glyph(index) {
            return Ok(glyph.char_index);
        }
        let count = self.store.glyph_count();
        if index == count {
            Ok(self.text.len())
        } else {
            Err(Error::glyph_out_of_bounds(index, count))
        }
    }

    /// The glyphs that the characters in `range` map to.
    ///
    /// Includes a whole ligature when `range` only covers part of it.
    pub fn glyph_range_for_character_range(
        &mut self,
        range: Range<usize>,
    ) -> Result<Range<usize>, Error> {
        self.check_character_range(&range)?;
        let start = self.glyph_index_for_character(range.start)?;
        if range.is_empty() {
            return Ok(start..start);
        }
        let last = self.glyph_index_for_character(range.end - 1)?;
        Ok(start..last + 1)
    }

    /// The characters that the glyphs in `range` map to.
    pub fn character_range_for_glyph_range(
        &mut self,
        range: Range<usize>,
    ) -> Result<Range<usize>, Error> {
        if range.start > range.end {
            return Err(Error::invalid_range(range.start, range.end, self.store.glyph_count()));
        }
        let start = self.character_index_for_glyph(range.start)?;
        let end = self.character_index_for_glyph(range.end)?;
        Ok(start..end)
    }

    /// Hides or shows glyph `index`. Hidden glyphs take no space, so the lines
    /// holding it are laid out again.
    pub fn set_not_shown(&mut self, index: usize, not_shown: bool) -> Result<(), Error> {
        let glyph = self.glyph_at_index(index)?;
        if glyph.flags.is_not_shown != not_shown {
            self.store
                .update_glyph_flags(index, |flags| flags.is_not_shown = not_shown);
            self.invalidate_layout(glyph.char_index, glyph.char_index + 1, 0);
        }
        Ok(())
    }

    /// Marks glyph `index` as drawing outside its line fragment.
    pub fn set_draws_outside_line_fragment(
        &mut self,
        index: usize,
        draws_outside: bool,
    ) -> Result<(), Error> {
        self.glyph_at_index(index)?;
        self.store.update_glyph_flags(index, |flags| {
            flags.draws_outside_line_fragment = draws_outside;
        });
        Ok(())
    }

    /// Drains the diagnostics collected during glyph generation.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        core::mem::take(&mut self.diagnostics)
    }

    // --- Layout ---

    fn ensure_layout(&mut self, target: LayoutTarget) {
        let mut char_index = 0;
        let mut glyph_index = 0;
        for k in 0..self.layouts.len() {
            if !self.layouts[k].is_complete() {
                self.layouts[k].set_start(char_index, glyph_index);
                self.layout_container(k, target);
                if !self.layouts[k].is_complete() {
                    return;
                }
            }
            char_index = self.layouts[k].char_range().end;
            glyph_index = self.layouts[k].glyph_range().end;
            let done = match target {
                LayoutTarget::Character(index) => index < char_index,
                LayoutTarget::Glyph(index) => index < glyph_index,
                LayoutTarget::Container(index) => k >= index,
            };
            if done {
                return;
            }
        }
    }

    /// Lays out lines in container `k` until `target` is met or the container is full.
    fn layout_container(&mut self, k: usize, target: LayoutTarget) {
        let Some(container) = self.layouts[k].container() else {
            if !self.layouts[k].fragments().is_empty() {
                self.layouts[k].invalidate_hard();
            }
            log::debug!("text container {k} was dropped, flowing text past it");
            self.layouts[k].set_complete();
            return;
        };
        let width = container.size().width;
        let text_len = self.text.len();
        loop {
            let layout = &self.layouts[k];
            let char_start = layout.char_range().end;
            let glyph_start = layout.glyph_range().end;
            if char_start >= text_len {
                self.layouts[k].set_complete();
                return;
            }
            let reached = match target {
                LayoutTarget::Character(index) => index < char_start,
                LayoutTarget::Glyph(index) => index < glyph_start,
                LayoutTarget::Container(_) => false,
            };
            if reached {
                return;
            }
            let (origin, row_width) = layout.next_row(width);
            if let Some(fragment) = self.reuse_soft(k, char_start, glyph_start, origin) {
                self.layouts[k].push_fragment(fragment, Rect::ZERO);
                continue;
            }
            let mut generator = Generator::new(
                &mut self.store,
                &self.text,
                &self.fonts,
                &self.options,
                &mut self.diagnostics,
            );
            let outcome = typeset_line(
                &mut generator,
                &*container,
                char_start,
                glyph_start,
                origin,
                row_width,
            );
            match outcome {
                LineOutcome::Line {
                    fragment,
                    remaining,
                } => self.layouts[k].push_fragment(fragment, remaining),
                LineOutcome::ContainerFull => {
                    self.layouts[k].set_complete();
                    return;
                }
            }
        }
    }

    /// Adopts the soft fragment for the line starting at `char_start`, if there is one
    /// at `origin` and its glyphs are unchanged.
    ///
    /// Glyphs regenerated since the fragment was laid out get its flags back.
    fn reuse_soft(
        &mut self,
        k: usize,
        char_start: usize,
        glyph_start: usize,
        origin: Point,
    ) -> Option<LineFragment> {
        let mut candidate = self.layouts[k].take_soft(char_start, origin)?;
        let glyph_end = glyph_boundary(&mut self.generator(), candidate.char_range.end);
        if glyph_end.checked_sub(glyph_start) != Some(candidate.glyph_range.len()) {
            self.layouts[k].diverged();
            return None;
        }
        candidate.rebase_glyphs(glyph_start);
        apply_line_flags(&mut self.store, &candidate);
        self.layouts[k].record_reuse();
        Some(candidate)
    }

    /// Lays out text up to and including the characters in `range`.
    pub fn ensure_layout_for_character_range(&mut self, range: Range<usize>) -> Result<(), Error> {
        self.check_character_range(&range)?;
        if let Some(last) = range.end.max(range.start + 1).min(self.text.len()).checked_sub(1) {
            self.ensure_layout(LayoutTarget::Character(last));
        }
        Ok(())
    }

    /// Lays out text up to and including the glyphs in `range`.
    pub fn ensure_layout_for_glyph_range(&mut self, range: Range<usize>) -> Result<(), Error> {
        if range.start > range.end {
            return Err(Error::invalid_range(range.start, range.end, self.store.glyph_count()));
        }
        self.generate_up_to_glyph(range.end)?;
        if let Some(last) = range.end.checked_sub(1) {
            self.ensure_layout(LayoutTarget::Glyph(last));
        }
        Ok(())
    }

    /// Lays out the container at `index` and every container before it.
    pub fn ensure_layout_for_text_container(&mut self, index: usize) -> Result<(), Error> {
        self.live_layout(index)?;
        self.ensure_layout(LayoutTarget::Container(index));
        Ok(())
    }

    /// The glyphs laid out in the container at `index`, laying it out first.
    pub fn glyph_range_for_text_container(&mut self, index: usize) -> Result<Range<usize>, Error> {
        self.ensure_layout_for_text_container(index)?;
        Ok(self.layouts[index].glyph_range())
    }

    /// The line fragment holding glyph `index`, laying out up to it.
    ///
    /// Returns `None` if the glyph does not fit into any container.
    pub fn line_fragment_for_glyph(
        &mut self,
        index: usize,
    ) -> Result<Option<&LineFragment>, Error> {
        self.glyph_at_index(index)?;
        self.ensure_layout(LayoutTarget::Glyph(index));
        Ok(self.fragment_for_glyph(index).map(|(_, fragment)| fragment))
    }

    /// The rectangle of the line fragment holding glyph `index`.
    pub fn line_fragment_rect_for_glyph(&mut self, index: usize) -> Result<Option<Rect>, Error> {
        Ok(self.line_fragment_for_glyph(index)?.map(|fragment| fragment.rect))
    }

    /// The used rectangle of the line fragment holding glyph `index`.
    pub fn line_fragment_used_rect_for_glyph(
        &mut self,
        index: usize,
    ) -> Result<Option<Rect>, Error> {
        Ok(self
            .line_fragment_for_glyph(index)?
            .map(|fragment| fragment.used_rect))
    }

    /// The index of the container glyph `index` is laid out in.
    pub fn text_container_for_glyph(&mut self, index: usize) -> Result<Option<usize>, Error> {
        self.glyph_at_index(index)?;
        self.ensure_layout(LayoutTarget::Glyph(index));
        Ok(self.fragment_for_glyph(index).map(|(k, _)| k))
    }

    /// The used rect of the container at `index`, from the layout done so far.
    ///
    /// Does not lay out. Repeated calls without changes in between are answered from a
    /// memo.
    pub fn used_rect_for_text_container(&self, index: usize) -> Result<Rect, Error> {
        Ok(self.live_layout(index)?.used_rect())
    }

    /// The first character not laid out in any container.
    pub fn first_unlaid_character_index(&self) -> usize {
        self.laid_out_end().0
    }

    /// The first glyph not laid out in any container.
    pub fn first_unlaid_glyph_index(&self) -> usize {
        self.laid_out_end().1
    }

    fn laid_out_end(&self) -> (usize, usize) {
        let mut end = (0, 0);
        for layout in &self.layouts {
            if layout.is_complete() || !layout.fragments().is_empty() {
                end = (layout.char_range().end, layout.glyph_range().end);
            }
            if !layout.is_complete() {
                break;
            }
        }
        end
    }

    // --- Drawing ---

    fn fragment_for_glyph(&self, index: usize) -> Option<(usize, &LineFragment)> {
        self.layouts.iter().enumerate().find_map(|(k, layout)| {
            let i = layout.fragment_index_for_glyph(index)?;
            Some((k, &layout.fragments()[i]))
        })
    }

    fn location_in_fragment(&self, fragment: &LineFragment, index: usize) -> Option<Point> {
        let point = fragment.point_for_glyph(index)?;
        let mut x = point.origin.x;
        for i in point.glyph_range.start..index {
            x += self.store.glyph(i)?.effective_advance();
        }
        Some(Point::new(x, point.origin.y))
    }

    /// The baseline origin of glyph `index`, relative to the origin of its line
    /// fragment. `None` if the glyph is not laid out.
    pub fn location_for_glyph_at_index(&self, index: usize) -> Option<Point> {
        let (_, fragment) = self.fragment_for_glyph(index)?;
        self.location_in_fragment(fragment, index)
    }

    /// One rectangle per line fragment of the container at `container` covering the
    /// glyphs in `range`, in container coordinates.
    ///
    /// `None` if none of the glyphs is laid out in the container.
    pub fn rect_array_for_glyph_range(
        &self,
        range: Range<usize>,
        container: usize,
    ) -> Option<Vec<Rect>> {
        let layout = self.layouts.get(container)?;
        let mut rects = Vec::new();
        for fragment in layout.fragments() {
            let start = range.start.max(fragment.glyph_range.start);
            let end = range.end.min(fragment.glyph_range.end);
            if start >= end {
                continue;
            }
            let x0 = self.location_in_fragment(fragment, start)?.x;
            let last = end - 1;
            let x1 = self.location_in_fragment(fragment, last)?.x
                + self.store.glyph(last)?.effective_advance();
            rects.push(Rect::new(
                fragment.rect.x0 + x0,
                fragment.rect.y0,
                fragment.rect.x0 + x1,
                fragment.rect.y1,
            ));
        }
        (!rects.is_empty()).then_some(rects)
    }

    /// The union of [`LayoutManager::rect_array_for_glyph_range`].
    pub fn bounding_rect_for_glyph_range(
        &self,
        range: Range<usize>,
        container: usize,
    ) -> Option<Rect> {
        self.rect_array_for_glyph_range(range, container)?
            .into_iter()
            .reduce(|a, b| a.union(b))
    }

    /// Verifies the run store and the layout caches against each other and the text.
    ///
    /// # Panics
    ///
    /// Panics if any structural invariant is broken.
    pub fn check_consistency(&self) {
        self.store.check_consistency();
        if self.store.len() != self.text.len() {
            consistency_failure(format_args!(
                "runs cover {} characters of {}",
                self.store.len(),
                self.text.len()
            ));
        }
        let mut previous_end = (0, 0);
        for (k, layout) in self.layouts.iter().enumerate() {
            let mut position = (layout.char_range().start, layout.glyph_range().start);
            if layout.is_complete() && position != previous_end {
                consistency_failure(format_args!(
                    "container {k} starts at {position:?} instead of {previous_end:?}"
                ));
            }
            for fragment in layout.fragments() {
                if (fragment.char_range.start, fragment.glyph_range.start) != position {
                    consistency_failure(format_args!(
                        "fragment {:?} of container {k} does not follow {position:?}",
                        fragment.char_range
                    ));
                }
                position = (fragment.char_range.end, fragment.glyph_range.end);
            }
            if position != (layout.char_range().end, layout.glyph_range().end) {
                consistency_failure(format_args!("container {k} range disagrees with its lines"));
            }
            if !layout.is_complete() {
                break;
            }
            previous_end = position;
        }
    }
}

/// The index of the first glyph of character `index`, or the number of glyphs at the
/// end of the text.
fn glyph_boundary<T: TextStore + ?Sized, F: FontMetrics + ?Sized>(
    generator: &mut Generator<'_, T, F>,
    index: usize,
) -> usize {
    if index >= generator.text().len() {
        generator.generate_all();
        return generator.store.glyph_count();
    }
    generator.generate_up_to_character(index);
    generator.store.glyph_index_for_char(index)
}
