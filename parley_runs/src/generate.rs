// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lazy glyph generation.
//!
//! Generation always continues at the run store's generated prefix and stops as soon
//! as the requested character or glyph exists, so a query never materializes more than
//! one cluster past what it needs.

use alloc::vec::Vec;

use peniko::kurbo::Size;

use crate::error::{consistency_failure, Diagnostic};
use crate::font::{FontId, FontMetrics};
use crate::glyph::{Glyph, GlyphFlags, GlyphId, GlyphRecord, Inscription};
use crate::options::LayoutOptions;
use crate::run::RunAttributes;
use crate::store::RunStore;
use crate::text::{TextAttributes, TextStore};
use crate::util::{is_combining_mark, is_line_separator};

const SOFT_HYPHEN: char = '\u{00AD}';
const OBJECT_REPLACEMENT: char = '\u{FFFC}';

/// How far generation has to go.
#[derive(Copy, Clone, Debug)]
enum Limit {
    /// Until the character at this index has a glyph.
    Character(usize),
    /// Until the glyph at this index exists.
    Glyph(usize),
}

/// Borrowed view of a layout manager's glyph generation state.
pub(crate) struct Generator<'a, T: ?Sized, F: ?Sized> {
    pub(crate) store: &'a mut RunStore,
    text: &'a T,
    fonts: &'a F,
    options: &'a LayoutOptions,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl<'a, T: TextStore + ?Sized, F: FontMetrics + ?Sized> Generator<'a, T, F> {
    pub(crate) fn new(
        store: &'a mut RunStore,
        text: &'a T,
        fonts: &'a F,
        options: &'a LayoutOptions,
        diagnostics: &'a mut Vec<Diagnostic>,
    ) -> Self {
        Self {
            store,
            text,
            fonts,
            options,
            diagnostics,
        }
    }

    pub(crate) fn text(&self) -> &'a T {
        self.text
    }

    pub(crate) fn fonts(&self) -> &'a F {
        self.fonts
    }

    pub(crate) fn options(&self) -> &'a LayoutOptions {
        self.options
    }

    /// Generates glyphs for every character up to and including `index`.
    pub(crate) fn generate_up_to_character(&mut self, index: usize) {
        self.generate(Limit::Character(index));
    }

    /// Generates glyphs until the glyph at `index` exists or the text runs out.
    pub(crate) fn generate_up_to_glyph(&mut self, index: usize) {
        self.generate(Limit::Glyph(index));
    }

    /// Generates everything.
    pub(crate) fn generate_all(&mut self) {
        self.generate(Limit::Character(usize::MAX));
    }

    /// The glyph at `index`, generating up to it.
    pub(crate) fn glyph(&mut self, index: usize) -> Option<Glyph> {
        self.generate_up_to_glyph(index);
        self.store.glyph(index)
    }

    fn satisfied(&self, limit: Limit) -> bool {
        let prefix = self.store.generated_prefix();
        prefix >= self.store.len()
            || match limit {
                Limit::Character(index) => prefix > index,
                Limit::Glyph(index) => self.store.prefix_glyphs() > index,
            }
    }

    fn generate(&mut self, limit: Limit) {
        while !self.satisfied(limit) {
            self.step(limit);
        }
    }

    /// Advances generation inside the run at the generated prefix.
    ///
    /// A step either restructures the run (split at an attribute change, merge into a
    /// continued predecessor) or appends glyphs to it.
    fn step(&mut self, limit: Limit) {
        let text = self.text;
        let prefix = self.store.generated_prefix();
        let (id, start) = self.store.locate_char(prefix);
        let run = self.store.node(id);
        let (current, generated) = (run.attributes, run.generated_chars);
        let run_start = start.chars;
        let run_end = run_start + run.char_length;
        let (range, attributes) = text.attribute_run(prefix).unwrap_or_else(|| {
            consistency_failure(format_args!(
                "text has {} characters but runs cover {}",
                text.len(),
                self.store.len()
            ))
        });
        let resolved = attributes.run_attributes();

        match current {
            None => {
                if range.end < run_end {
                    self.store.split_run(run_start, range.end - run_start);
                }
                self.begin_run(run_start, resolved);
            }
            Some(current) if current != resolved => {
                if generated == 0 {
                    self.store.update_run(run_start, |run| run.attributes = None);
                } else {
                    self.store.split_run(run_start, generated);
                }
            }
            Some(_) => {
                if range.end < run_end {
                    self.store.split_run(run_start, range.end - run_start);
                }
                let end = range.end.min(run_end);
                self.fill(limit, run_start, start.glyphs, end, attributes, resolved);
            }
        }
    }

    /// Resolves the attributes of the ungenerated run at `run_start`, folding it into
    /// its predecessor when they match.
    fn begin_run(&mut self, run_start: usize, resolved: RunAttributes) {
        let (id, _) = self.store.locate_char(run_start);
        let run_length = self.store.node(id).char_length;
        let prev = self.store.prev_run(id);
        let continued = prev.is_some_and(|prev| self.store.node(prev).attributes == Some(resolved));

        if let Some(prev) = prev.filter(|_| continued && self.options.merge_continued_runs) {
            let prev_length = self.store.node(prev).char_length;
            if prev_length + run_length <= self.store.max_run_length() {
                self.store.merge_with_next(run_start - prev_length);
                self.refresh_continued(run_start + run_length, resolved);
                return;
            }
        }

        self.store.update_run(run_start, |run| {
            run.attributes = Some(resolved);
            run.continued = continued;
        });
        self.refresh_continued(run_start + run_length, resolved);
        log::trace!("resolved {resolved:?} for run at character {run_start}");
    }

    /// Recomputes `continued` for the run starting at `start`, which follows a run
    /// with `resolved` attributes.
    fn refresh_continued(&mut self, start: usize, resolved: RunAttributes) {
        if start >= self.store.len() {
            return;
        }
        let (id, _) = self.store.locate_char(start);
        if let Some(attributes) = self.store.node(id).attributes {
            let continued = attributes == resolved;
            self.store.update_run(start, |run| run.continued = continued);
        }
    }

    /// Appends glyphs to the run at `run_start` for characters before `end`, stopping
    /// early once `limit` is met.
    fn fill(
        &mut self,
        limit: Limit,
        run_start: usize,
        glyph_start: usize,
        end: usize,
        attributes: &TextAttributes,
        resolved: RunAttributes,
    ) {
        let (id, _) = self.store.locate_char(run_start);
        let run = self.store.node(id);
        let mut index = run_start + run.generated_chars;
        let mut glyph_count = glyph_start + run.glyph_length();
        let first = index;

        let mut glyphs = Vec::new();
        while index < end {
            let done = match limit {
                Limit::Character(target) => index > target,
                Limit::Glyph(target) => glyph_count > target,
            };
            if done {
                break;
            }
            let (record, consumed) = self.cluster(index, end, run_start, attributes, resolved);
            glyphs.push(record);
            glyph_count += 1;
            index += consumed;
        }

        let generated = index - run_start;
        self.store.update_run(run_start, |run| {
            run.glyphs.extend(glyphs);
            run.generated_chars = generated;
            run.update_complete();
        });
        self.store.normalize_prefix();
        log::trace!("generated glyphs for characters {first}..{index}");
    }

    /// Produces the glyph for the cluster starting at `index` and the number of
    /// characters it covers.
    fn cluster(
        &mut self,
        index: usize,
        end: usize,
        run_start: usize,
        attributes: &TextAttributes,
        resolved: RunAttributes,
    ) -> (GlyphRecord, usize) {
        let ch = self.char_at(index);
        let font = resolved.font;
        let mut record = GlyphRecord {
            id: GlyphId::CONTROL,
            char_offset: u32::try_from(index - run_start).unwrap_or_else(|_| {
                consistency_failure(format_args!("run at {run_start} exceeds u32 offsets"))
            }),
            flags: GlyphFlags::default(),
            bidi_level: resolved.bidi_level,
            advancement: Size::ZERO,
        };

        if ch == OBJECT_REPLACEMENT {
            if let Some(size) = attributes.attachment {
                record.advancement = size;
                return (record, 1);
            }
        }
        if ch == '\t' || is_line_separator(ch) || ch.is_control() {
            record.flags.inscription = Inscription::Null;
            record.flags.is_not_shown = true;
            return (record, 1);
        }
        if ch == SOFT_HYPHEN {
            record.id = self.map_character(index, '-', font);
            record.advancement = self.fonts.advancement(font, record.id);
            record.flags.soft = true;
            record.flags.is_not_shown = true;
            return (record, 1);
        }

        let mut consumed = 1;
        if resolved.ligature > 0 && index + 1 < end {
            let next = self.char_at(index + 1);
            if let Some(ligature) = self.fonts.ligature(font, ch, next) {
                record.id = ligature;
                consumed = 2;
            }
        }
        if consumed == 1 {
            record.id = self.map_character(index, ch, font);
        }
        record.advancement = self.fonts.advancement(font, record.id);
        if is_combining_mark(ch) {
            record.flags.inscription = Inscription::Overstrike;
            record.advancement.width = 0.0;
        } else if let Some(kern) = attributes.kern {
            record.advancement.width += kern;
        }
        record.flags.elastic = matches!(ch, ' ' | '\u{00A0}');
        (record, consumed)
    }

    fn char_at(&self, index: usize) -> char {
        self.text.char_at(index).unwrap_or_else(|| {
            consistency_failure(format_args!("text has no character {index}"))
        })
    }

    /// Maps `ch` through the font, substituting the missing glyph.
    fn map_character(&mut self, index: usize, ch: char, font: FontId) -> GlyphId {
        if let Some(glyph) = self.fonts.glyph_for_character(font, ch) {
            return glyph;
        }
        log::warn!("no glyph for {ch:?} at character {index} in {font:?}");
        self.diagnostics.push(Diagnostic::MissingGlyph {
            char_index: index,
            ch,
            font,
        });
        GlyphId::NOTDEF
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::Generator;
    use crate::font::{FontCollection, FontFace};
    use crate::glyph::{GlyphId, Inscription};
    use crate::options::LayoutOptions;
    use crate::store::RunStore;
    use crate::text::{AttributedString, TextAttributes, TextStore};

    #[test]
    fn generation_stops_at_the_requested_character() {
        let mut fonts = FontCollection::new();
        let font = fonts.add(FontFace::new(10.0));
        let text = AttributedString::new("abcdefghij", TextAttributes::new(font));
        let options = LayoutOptions::default();
        let mut store = RunStore::new(options.max_run_length, options.skip_list_seed);
        store.apply_edit(0, 0, text.len());
        let mut diagnostics = Vec::new();
        let mut generator = Generator::new(&mut store, &text, &fonts, &options, &mut diagnostics);

        generator.generate_up_to_character(3);
        assert_eq!(generator.store.generated_prefix(), 4, "characters 0..=3");
        generator.generate_up_to_glyph(5);
        assert_eq!(generator.store.generated_prefix(), 6, "glyphs 0..=5");
        generator.generate_all();
        assert_eq!(generator.store.glyph_count(), 10, "one glyph per character");
        store.check_consistency();
    }

    #[test]
    fn special_characters_get_their_flags() {
        let mut fonts = FontCollection::new();
        let font = fonts.add(FontFace::new(10.0).with_ligature('f', 'i', 7.0));
        let text = AttributedString::new("fi\u{AD}a\u{301}\n", TextAttributes::new(font));
        let options = LayoutOptions::default();
        let mut store = RunStore::new(options.max_run_length, options.skip_list_seed);
        store.apply_edit(0, 0, text.len());
        let mut diagnostics = Vec::new();
        let mut generator = Generator::new(&mut store, &text, &fonts, &options, &mut diagnostics);
        generator.generate_all();

        let glyphs: Vec<_> = (0..5).filter_map(|i| store.glyph(i)).collect();
        assert_eq!(glyphs.len(), 5, "ligature folds two characters into one glyph");
        assert_eq!(glyphs[0].advancement.width, 7.0, "ligature advance");
        assert_eq!(glyphs[1].char_index, 2, "soft hyphen follows the ligature");
        assert!(glyphs[1].flags.soft && glyphs[1].flags.is_not_shown, "soft hyphen");
        assert_eq!(glyphs[3].flags.inscription, Inscription::Overstrike, "mark");
        assert_eq!(glyphs[3].effective_advance(), 0.0, "marks take no space");
        assert_eq!(glyphs[4].id, GlyphId::CONTROL, "line break");
        assert!(glyphs[4].flags.is_not_shown, "line break is not shown");
    }
}
